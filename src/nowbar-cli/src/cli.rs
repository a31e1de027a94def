use clap::Parser;
use nowbar_core::ConfigOverrides;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "nowbar", version, about = "Now-playing line for status bars")]
pub struct Cli {
    /// Config file (TOML, or JSON when the name ends in .json)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// MPRIS player name, with or without the org.mpris.MediaPlayer2. prefix
    #[arg(short, long)]
    pub player: Option<String>,
    /// Output template, e.g. "{status:icon} {artist} – {title:.30,…}"
    #[arg(short, long)]
    pub format: Option<String>,
    /// Text shown when nothing is playing
    #[arg(short = 'n', long)]
    pub placeholder: Option<String>,
    #[arg(long, conflicts_with = "no_markup_escape")]
    pub markup_escape: bool,
    #[arg(long)]
    pub no_markup_escape: bool,
    #[arg(long, conflicts_with = "no_sanitize_unicode")]
    pub sanitize_unicode: bool,
    #[arg(long)]
    pub no_sanitize_unicode: bool,
    #[arg(long, conflicts_with = "no_dedupe")]
    pub dedupe: bool,
    #[arg(long)]
    pub no_dedupe: bool,
    /// Exit instead of waiting when the player is not running
    #[arg(long)]
    pub nowait: bool,
    /// Do not read button events from stdin
    #[arg(long)]
    pub no_input: bool,
}

impl Cli {
    /// The command-line layer, applied after the config file.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            player: self.player.clone(),
            format: self.format.clone(),
            placeholder: self.placeholder.clone(),
            markup_escape: paired_flag(self.markup_escape, self.no_markup_escape),
            sanitize_unicode: paired_flag(self.sanitize_unicode, self.no_sanitize_unicode),
            dedupe: paired_flag(self.dedupe, self.no_dedupe),
            ..ConfigOverrides::default()
        }
    }
}

fn paired_flag(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}
