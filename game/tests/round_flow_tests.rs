use std::sync::Arc;
use std::time::Duration;

use engine::HeadlessRunner;
use engine::audio::SoundBank;
use engine::input::PointerEvent;
use engine::surface::{NodeId, NodeKind};
use it_rush::content::ContentPack;
use it_rush::leaderboard::PromptInput;
use it_rush::orchestrator::{
    FADE_STEP, FADE_STEPS, Game, GameInput, GameOptions, NEXT_TASK_DELAY,
};
use it_rush::round::ResultTier;
use it_rush::tasks::TaskKind;
use it_rush::view::Screen;
use proptest::prelude::*;

const GOOD_BACKUP: &str = "Backup (yesterday, 23:00, stable)";

fn runner(pool: Vec<TaskKind>) -> HeadlessRunner<Game> {
    HeadlessRunner::new(Game::headless(GameOptions {
        seed: Some(21),
        task_pool: pool,
        ..GameOptions::default()
    }))
}

fn backup_runner() -> HeadlessRunner<Game> {
    let mut content = ContentPack::builtin();
    content.backups.truncate(1);
    HeadlessRunner::new(Game::new(
        GameOptions {
            seed: Some(21),
            task_pool: vec![TaskKind::RestoreBackup],
            ..GameOptions::default()
        },
        Arc::new(content),
        SoundBank::silent(),
    ))
}

fn backup_choice(game: &Game, correct: bool) -> NodeId {
    game.surface()
        .nodes()
        .iter()
        .filter(|n| n.kind == NodeKind::Button && n.enabled)
        .find(|n| (n.text == GOOD_BACKUP) == correct)
        .map(|n| n.id)
        .expect("backup choices on screen")
}

#[test]
fn idle_round_ends_exactly_on_the_last_tick() {
    let mut r = runner(vec![TaskKind::SortData]);
    r.send(GameInput::Start);
    assert_eq!(r.sim().hud().timer, "Time: 3:00");

    r.run_for(Duration::from_secs(179));
    assert_eq!(r.sim().screen(), Screen::Playing);
    assert_eq!(r.sim().hud().timer, "Time: 0:01");

    r.run_for(Duration::from_secs(1));
    let game = r.sim();
    assert_eq!(game.screen(), Screen::Result);
    assert_eq!(game.hud().timer, "Time: 0:00");
    assert!(game.current_task().is_none());
    assert!(game.surface().is_empty());

    let result = game.result().expect("result shown");
    assert_eq!(result.score, 0);
    assert_eq!(result.tier, ResultTier::Encouragement);
    assert_eq!(game.leaderboard().prompt().map(|p| p.score), Some(0));
}

#[test]
fn replay_waits_for_the_name_prompt() {
    let mut r = runner(vec![TaskKind::DecryptMessage]);
    r.send(GameInput::Start);
    r.run_for(Duration::from_secs(181));

    r.send(GameInput::Replay);
    assert_eq!(r.sim().screen(), Screen::Result);

    r.send(GameInput::Prompt(PromptInput::ClickOutside));
    assert!(r.sim().is_round_closed());
    r.send(GameInput::Replay);
    assert_eq!(r.sim().screen(), Screen::Start);

    r.send(GameInput::Start);
    assert_eq!(r.sim().screen(), Screen::Playing);
    assert_eq!(r.sim().hud().timer, "Time: 3:00");
    assert_eq!(r.sim().round().tasks_completed, 1);
}

#[test]
fn tasks_keep_coming_after_every_answer() {
    let mut r = backup_runner();
    r.send(GameInput::Start);
    for n in 1..=4 {
        assert_eq!(r.sim().round().tasks_completed, n);
        let id = backup_choice(r.sim(), n % 2 == 0);
        r.send(GameInput::Pointer(PointerEvent::Click { target: id }));
        assert!(r.sim().is_task_settled());
        r.run_for(FADE_STEP * FADE_STEPS + NEXT_TASK_DELAY);
    }
    assert_eq!(r.sim().round().tasks_completed, 5);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn score_moves_by_award_or_floored_penalty(answers in prop::collection::vec(any::<bool>(), 1..12)) {
        let mut r = backup_runner();
        r.send(GameInput::Start);
        for correct in answers {
            let before = r.sim().round();
            let id = backup_choice(r.sim(), correct);
            r.send(GameInput::Pointer(PointerEvent::Click { target: id }));
            let after = r.sim().round().score;
            if correct {
                prop_assert_eq!(after, before.score + 100 + before.time_left / 10);
            } else {
                prop_assert_eq!(after, before.score - before.score.min(50));
            }
            r.run_for(FADE_STEP * FADE_STEPS + NEXT_TASK_DELAY);
        }
    }
}
