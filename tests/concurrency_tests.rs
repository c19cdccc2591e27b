//! Concurrency tests for the shared lobby
//!
//! Commands arriving at the same time must see a consistent lobby: the start
//! sequence fires once, and a close racing joins never produces mentions for a
//! lobby that is already gone.

mod fixtures;

use fixtures::{command, count_text, create_test_coordinator, players, user};
use futures::future::join_all;
use quorum_lobby::lobby::{messages, CloseReason, Transition};
use std::time::{Duration, Instant};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_joins_start_exactly_once() {
    let (coordinator, sender) = create_test_coordinator(5);
    let owner = user("Owner");
    coordinator.handle_command(command("!open", &owner)).await.unwrap();

    // Twelve joiners, each of which could complete the quorum
    let joiners = players(12);
    let tasks = joiners.iter().map(|player| {
        let coordinator = coordinator.clone();
        let event = command("!join", player);
        tokio::spawn(async move { coordinator.handle_command(event).await })
    });

    let outcomes: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked").expect("dispatch failed"))
        .collect();

    let starts = outcomes.iter().filter(|o| o.started_game()).count();
    assert_eq!(starts, 1);

    let sent = sender.sent();
    assert_eq!(count_text(&sent, &messages::ready_to_begin(5)), 1);

    // The lobby that started held exactly five people, owner first
    let start = outcomes.iter().find(|o| o.started_game()).unwrap();
    let mentions = start.texts()[1];
    assert_eq!(mentions.split(' ').count(), 5);
    assert!(mentions.starts_with("<@owner>"));

    // Joiners after the start found no lobby, or opened nothing
    assert!(coordinator.current_lobby().await.is_none());
    assert_eq!(coordinator.stats().unwrap().games_started, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_close_racing_joins() {
    for _ in 0..20 {
        let (coordinator, sender) = create_test_coordinator(4);
        let owner = user("Owner");
        coordinator.handle_command(command("!open", &owner)).await.unwrap();

        let mut tasks = Vec::new();
        for player in players(3) {
            let coordinator = coordinator.clone();
            tasks.push(tokio::spawn(async move {
                coordinator.handle_command(command("!join", &player)).await
            }));
        }
        {
            let coordinator = coordinator.clone();
            tasks.push(tokio::spawn(async move {
                coordinator.handle_command(command("!close", &owner)).await
            }));
        }

        let outcomes: Vec<_> = join_all(tasks)
            .await
            .into_iter()
            .map(|joined| joined.expect("task panicked").expect("dispatch failed"))
            .collect();

        let closed_by_owner = outcomes
            .iter()
            .any(|o| o.transition == Transition::Closed(CloseReason::Owner));
        let started = outcomes.iter().any(|o| o.started_game());

        // Exactly one of the two ways out of the lobby happened
        assert!(closed_by_owner ^ started);
        assert!(coordinator.current_lobby().await.is_none());

        let mention_messages = sender
            .texts()
            .iter()
            .filter(|text| text.starts_with("<@"))
            .count();
        assert_eq!(mention_messages, usize::from(started));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_commands_stay_responsive() {
    let (coordinator, _sender) = create_test_coordinator(1000);
    let owner = user("Owner");
    coordinator.handle_command(command("!open", &owner)).await.unwrap();

    let start = Instant::now();
    let tasks = players(200).into_iter().map(|player| {
        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            coordinator.handle_command(command("!join", &player)).await?;
            coordinator.handle_command(command("!status", &player)).await
        })
    });

    for joined in join_all(tasks).await {
        joined.expect("task panicked").expect("dispatch failed");
    }

    assert!(start.elapsed() < Duration::from_secs(5));
    let lobby = coordinator.current_lobby().await.unwrap();
    assert_eq!(lobby.member_count(), 201);
    assert!(lobby.is_owner(&owner));
}
