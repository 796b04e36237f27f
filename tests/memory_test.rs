mod helpers;

use helpers::{add_pair, assert_window_invariant, test_manager, USER};
use solace::memory::ValidationError;
use solace::session::{Role, DEFAULT_TITLE};

#[test]
fn trigger_fires_at_threshold_and_again_after_update() {
    let manager = test_manager(6, 4);
    let mut session = manager.sessions().create_session(USER, None);

    let mut fired_at = Vec::new();
    for n in 1..=20 {
        let role = if n % 2 == 1 { Role::User } else { Role::Assistant };
        assert!(manager
            .add_message(&mut session, role, &format!("message {n}"))
            .unwrap());
        assert_window_invariant(&manager, &session);

        if manager.needs_summary_update(&session) {
            fired_at.push(n);
            assert!(manager.update_summary(&mut session, "A plain-text summary."));
            assert!(!manager.needs_summary_update(&session));
            assert_window_invariant(&manager, &session);
        }
    }

    // 4 messages aged out at n = 10; 4 more at n = 14, then 18.
    assert_eq!(fired_at, vec![10, 14, 18]);
    assert_eq!(session.summarized_count(), 12);
}

#[test]
fn trigger_is_monotone_until_summarized() {
    let manager = test_manager(6, 4);
    let mut session = manager.sessions().create_session(USER, None);

    let mut seen_true = false;
    for n in 1..=10 {
        add_pair(&manager, &mut session, n);
        let due = manager.needs_summary_update(&session);
        assert!(!(seen_true && !due), "trigger went false without an update");
        seen_true |= due;
    }
    assert!(seen_true);
}

#[test]
fn window_is_exact_after_current_summary() {
    let manager = test_manager(6, 4);
    let mut session = manager.sessions().create_session(USER, None);
    for n in 1..=10 {
        add_pair(&manager, &mut session, n);
    }

    // Nothing summarized yet: everything is verbatim.
    let context = manager.get_memory_context(&session);
    assert_eq!(context.recent_messages.len(), 20);
    assert!(context.context_prompt.is_empty());

    assert!(manager.update_summary(&mut session, "Talked through the week."));
    let context = manager.get_memory_context(&session);
    assert_eq!(context.recent_messages.len(), 6);
    assert_eq!(context.recent_messages[0].content, "user message 8");
    assert_eq!(context.summary.as_ref().unwrap().message_count, 14);
    assert!(context.context_prompt.contains("Talked through the week."));
    assert_window_invariant(&manager, &session);
}

#[test]
fn summary_prompt_covers_only_new_older_messages() {
    let manager = test_manager(6, 4);
    let mut session = manager.sessions().create_session(USER, None);
    for n in 1..=5 {
        add_pair(&manager, &mut session, n);
    }
    // 10 messages, window 6: messages 1..=4 aged out.
    let prompt = manager.generate_summary_prompt(&session).unwrap();
    assert!(prompt.contains("user message 1"));
    assert!(prompt.contains("assistant reply 2"));
    assert!(!prompt.contains("user message 3"));

    assert!(manager.update_summary(&mut session, "Covered the first two exchanges."));
    assert!(manager.generate_summary_prompt(&session).is_none());

    add_pair(&manager, &mut session, 6);
    add_pair(&manager, &mut session, 7);
    let prompt = manager.generate_summary_prompt(&session).unwrap();
    assert!(prompt.contains("Covered the first two exchanges."));
    assert!(prompt.contains("user message 3"));
    assert!(!prompt.contains("user message 1"));
    assert!(!prompt.contains("user message 5"));
}

#[test]
fn structured_output_fills_every_field() {
    let manager = test_manager(2, 1);
    let mut session = manager.sessions().create_session(USER, None);
    for n in 1..=3 {
        add_pair(&manager, &mut session, n);
    }

    let raw = r#"Sure! Here it is:
{"summary": "User is settling into a new job.", "keyTopics": ["work"], "emotional_themes": ["nervous"], "userMentions": ["manager Dana"]}"#;
    assert!(manager.update_summary(&mut session, raw));

    let summary = session.summary.clone().unwrap();
    assert_eq!(summary.summary, "User is settling into a new job.");
    assert_eq!(summary.key_topics, vec!["work"]);
    assert_eq!(summary.emotional_themes, vec!["nervous"]);
    assert_eq!(summary.user_mentions, vec!["manager Dana"]);
    assert_eq!(summary.message_count, 4);

    // Persisted, not just set in memory.
    let loaded = manager.sessions().get_session(&session.id).unwrap();
    assert_eq!(loaded.summary, Some(summary));
}

#[test]
fn garbage_model_output_never_fails() {
    let manager = test_manager(2, 1);
    let mut session = manager.sessions().create_session(USER, None);
    for n in 1..=3 {
        add_pair(&manager, &mut session, n);
    }

    let long = "x".repeat(1000);
    let inputs = [
        "",
        "   ",
        "{",
        "}{",
        "{\"summary\": }",
        "{\"keyTopics\": [1, 2]}",
        "null",
        "[1, 2, 3]",
        "\u{0}\u{1}\u{fffd}",
        long.as_str(),
    ];
    for raw in inputs {
        assert!(manager.update_summary(&mut session, raw), "input {raw:?}");
        let summary = session.summary.as_ref().unwrap();
        assert!(summary.summary.chars().count() <= 300);
        assert_eq!(summary.message_count, 4);
        assert_window_invariant(&manager, &session);
    }
}

#[test]
fn quick_summary_reads_only_older_user_messages() {
    let manager = test_manager(2, 1);
    let mut session = manager.sessions().create_session(USER, None);

    let script = [
        (Role::User, "Work has been brutal and I feel anxious all the time"),
        (Role::Assistant, "That sounds hard. How is your sleep and your family?"),
        (Role::User, "My family is fine but I'm worried about money"),
        (Role::Assistant, "Money worries are common."),
        (Role::User, "School starts next week"),
        (Role::Assistant, "Tell me more."),
    ];
    for (role, content) in script {
        assert!(manager.add_message(&mut session, role, content).unwrap());
    }

    // The last two messages are still in the window.
    let summary = manager.create_quick_summary(&session);
    assert_eq!(summary.message_count, 4);
    assert_eq!(summary.key_topics, vec!["work", "family", "money"]);
    assert_eq!(summary.emotional_themes, vec!["anxiety", "worry"]);
    assert!(!summary.key_topics.iter().any(|t| t == "sleep" || t == "school"));
    assert_eq!(
        summary.summary,
        "Earlier conversation of 4 messages touching on work, family, money."
    );

    assert!(manager.apply_quick_summary(&mut session));
    assert!(!manager.needs_summary_update(&session));
    assert_window_invariant(&manager, &session);
}

#[test]
fn first_user_message_names_the_session() {
    let manager = test_manager(10, 6);
    let mut session = manager.sessions().create_session(USER, None);
    assert_eq!(session.title, DEFAULT_TITLE);

    manager
        .add_message(&mut session, Role::Assistant, "Hi, how are you today?")
        .unwrap();
    assert_eq!(session.title, DEFAULT_TITLE);

    manager
        .add_message(&mut session, Role::User, "  Rough morning at the office  ")
        .unwrap();
    assert_eq!(session.title, "Rough morning at the office");
    assert_eq!(session.messages[1].content, "Rough morning at the office");

    manager
        .add_message(&mut session, Role::User, "Something else entirely")
        .unwrap();
    assert_eq!(session.title, "Rough morning at the office");

    let mut titled = manager.sessions().create_session(USER, Some("Kept"));
    manager
        .add_message(&mut titled, Role::User, "This should not rename it")
        .unwrap();
    assert_eq!(titled.title, "Kept");
}

#[test]
fn blank_messages_are_rejected() {
    let manager = test_manager(10, 6);
    let mut session = manager.sessions().create_session(USER, None);

    assert_eq!(
        manager.add_message(&mut session, Role::User, " \n\t "),
        Err(ValidationError::EmptyContent)
    );
    assert!(session.messages.is_empty());
}

#[test]
fn system_messages_are_outside_the_window() {
    let manager = test_manager(2, 1);
    let mut session = manager.sessions().create_session(USER, None);
    manager
        .add_message(&mut session, Role::System, "Be gentle.")
        .unwrap();
    for n in 1..=2 {
        add_pair(&manager, &mut session, n);
    }

    let context = manager.get_memory_context(&session);
    assert!(context.recent_messages.iter().all(|m| m.role != Role::System));
    assert_window_invariant(&manager, &session);

    let request = manager.prepare_chat(&session);
    assert!(request.system_prompt.unwrap().contains("Be gentle."));
}

#[test]
fn failed_write_keeps_message_in_memory() {
    let stores = helpers::unlocked_stores();
    let sessions = std::sync::Arc::new(solace::session::SessionStore::new(std::sync::Arc::clone(
        &stores.chats,
    )));
    let manager = solace::memory::MemoryManager::new(sessions, Default::default()).unwrap();
    let mut session = manager.sessions().create_session(USER, None);

    stores.lock();
    let persisted = manager
        .add_message(&mut session, Role::User, "still here")
        .unwrap();
    assert!(!persisted);
    assert_eq!(session.messages.len(), 1);
}
