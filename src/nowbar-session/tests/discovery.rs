mod common;

use common::{
    drain, instance, owner_of, properties_of, session, settings, track, FakeBus, NAMESPACE,
};
use nowbar_session::{MatchMode, SignalMatch, Startup};

fn registered(bus: &FakeBus, suffixes: &[&str]) {
    for suffix in suffixes {
        bus.preregister(&instance(suffix), "Playing", track(&["Artist"], suffix));
    }
}

#[tokio::test]
async fn most_recent_live_instance_is_selected() {
    let (bus, _events) = FakeBus::new();
    registered(&bus, &["a", "b", "c"]);
    let lookalike = "org.mpris.MediaPlayer2.vlcx.a";
    bus.preregister(lookalike, "Playing", track(&[], "other"));

    let mut session = session(&bus, settings("{title}"));
    assert_eq!(session.start(false).await.unwrap(), Startup::Attached);
    assert_eq!(session.match_mode(), MatchMode::Prefix);
    assert_eq!(session.identity(), instance("c"));
    assert_eq!(
        session.registry().recent_first().collect::<Vec<_>>(),
        [instance("c"), instance("b"), instance("a")]
    );
    assert_eq!(session.output(), &["c".to_string()]);
}

#[tokio::test]
async fn failed_owner_query_evicts_candidate() {
    let (bus, _events) = FakeBus::new();
    registered(&bus, &["a", "b", "c"]);
    bus.fail_owner_query(&instance("c"));

    let mut session = session(&bus, settings("{title}"));
    session.start(false).await.unwrap();
    assert_eq!(session.identity(), instance("b"));
    assert!(!session.registry().contains(&instance("c")));
    assert_eq!(session.registry().len(), 2);
}

#[tokio::test]
async fn exact_name_wins_over_instances() {
    let (bus, _events) = FakeBus::new();
    registered(&bus, &["a"]);
    bus.preregister(NAMESPACE, "Paused", track(&["Exact"], "bare"));

    let mut session = session(&bus, settings("{title}"));
    session.start(false).await.unwrap();
    assert_eq!(session.match_mode(), MatchMode::Exact);
    assert_eq!(session.identity(), NAMESPACE);
    assert!(session.registry().is_empty());
    let discovery = SignalMatch::NameOwnerChanged { name: None };
    assert!(!bus.subscriptions().contains(&discovery));
}

#[tokio::test]
async fn lost_instance_hands_over_to_next_live_one() {
    let (bus, mut events) = FakeBus::new();
    registered(&bus, &["a", "b", "c"]);
    let mut session = session(&bus, settings("{title}"));
    session.start(false).await.unwrap();

    bus.vanish_silently(&instance("b"));
    bus.stop_player(&instance("c"));
    drain(&mut session, &mut events).await;

    assert!(session.is_connected());
    assert_eq!(session.identity(), instance("a"));
    assert_eq!(
        session.registry().recent_first().collect::<Vec<_>>(),
        [instance("a")]
    );
    assert_eq!(session.output(), &["c".to_string(), "a".to_string()]);
    let subscriptions = bus.subscriptions();
    assert!(subscriptions.contains(&properties_of(&instance("a"))));
    assert!(!subscriptions.contains(&properties_of(&instance("c"))));
}

#[tokio::test]
async fn evicted_instance_is_reinserted_when_it_reappears() {
    let (bus, mut events) = FakeBus::new();
    registered(&bus, &["a", "b", "c"]);
    let mut session = session(&bus, settings("{title}"));
    session.start(false).await.unwrap();

    bus.vanish_silently(&instance("b"));
    bus.stop_player(&instance("c"));
    drain(&mut session, &mut events).await;
    assert!(!session.registry().contains(&instance("b")));

    bus.start_player(&instance("b"), "Playing", track(&[], "b again"));
    drain(&mut session, &mut events).await;
    assert!(session.registry().contains(&instance("b")));
    assert_eq!(session.identity(), instance("a"));
}

#[tokio::test]
async fn waiting_session_attaches_to_first_instance() {
    let (bus, mut events) = FakeBus::new();
    let mut session = session(&bus, settings("{status} {title}"));
    assert_eq!(session.start(true).await.unwrap(), Startup::Waiting);
    assert_eq!(session.match_mode(), MatchMode::Unknown);

    bus.start_player(&instance("1"), "Playing", track(&[], "first"));
    bus.start_player(&instance("2"), "Playing", track(&[], "second"));
    drain(&mut session, &mut events).await;

    assert_eq!(session.match_mode(), MatchMode::Prefix);
    assert_eq!(session.identity(), instance("1"));
    assert_eq!(session.registry().len(), 2);
    assert_eq!(session.output(), &["Playing first".to_string()]);
}

#[tokio::test]
async fn exact_name_appearing_replaces_instance() {
    let (bus, mut events) = FakeBus::new();
    registered(&bus, &["a"]);
    let mut session = session(&bus, settings("{title}"));
    session.start(false).await.unwrap();

    bus.start_player(NAMESPACE, "Playing", track(&[], "bare"));
    drain(&mut session, &mut events).await;

    assert_eq!(session.match_mode(), MatchMode::Exact);
    assert_eq!(session.identity(), NAMESPACE);
    assert_eq!(session.output(), &["a".to_string(), "bare".to_string()]);
    let subscriptions = bus.subscriptions();
    assert_eq!(subscriptions.len(), 2);
    assert!(subscriptions.contains(&properties_of(NAMESPACE)));
    assert!(subscriptions.contains(&owner_of(NAMESPACE)));
}

#[tokio::test]
async fn exact_player_restart_keeps_subscriptions() {
    let (bus, mut events) = FakeBus::new();
    bus.preregister(NAMESPACE, "Playing", track(&["X"], "one"));
    let mut session = session(&bus, settings("{title}"));
    session.start(false).await.unwrap();

    bus.stop_player(NAMESPACE);
    drain(&mut session, &mut events).await;
    assert!(!session.is_connected());
    assert_eq!(bus.subscriptions().len(), 2);
    assert!(bus.released().is_empty());

    bus.start_player(NAMESPACE, "Playing", track(&["X"], "two"));
    drain(&mut session, &mut events).await;
    assert!(session.is_connected());
    assert_eq!(
        session.output(),
        &["one".to_string(), String::new(), "two".to_string()]
    );
}
