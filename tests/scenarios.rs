use std::sync::Arc;

use fraudsim::scenario::{Difficulty, FraudCategory, VictimSetup};
use fraudsim::{
    AgentId, AgentRegistry, Alignment, EngineConfig, LocalizedText, ManualClock, Scenario, ScenarioCatalog,
    SimulationEngine, SimulationStatus, Step, StepType,
};

fn scenario(id: &str, steps: Vec<Step>) -> Arc<Scenario> {
    Arc::new(Scenario {
        id: id.to_string(),
        title: LocalizedText::new(id, id),
        category: FraudCategory::CallCenter,
        difficulty: Difficulty::Beginner,
        estimated_duration_secs: 0,
        description: LocalizedText::default(),
        involved_agents: vec![AgentId::from("a0"), AgentId::from("a2")],
        evil_agents: vec![AgentId::from("a0")],
        victim_setup: VictimSetup {
            default_name: "Victim".to_string(),
            default_money: 1_000,
            context: LocalizedText::default(),
        },
        steps,
        money_at_risk: 0,
        educational_points: vec![LocalizedText::new("อย่าโอนเงิน", "Never transfer money to callers")],
        real_world_cases: Vec::new(),
    })
}

fn engine() -> (SimulationEngine, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let engine = SimulationEngine::with_clock(EngineConfig::default(), AgentRegistry::builtin(), clock.clone()).unwrap();
    (engine, clock)
}

fn play(engine: &mut SimulationEngine, name: &str, money: u64, scenario: Arc<Scenario>) {
    engine.start_setup();
    engine.set_user_profile(name, money);
    engine.load_and_play(scenario);
}

/// Advances the clock to the pending deadline and fires it.
fn fire_next(engine: &mut SimulationEngine, clock: &ManualClock) -> bool {
    match engine.next_deadline_ms() {
        Some(due) => {
            clock.advance_to(due);
            engine.poll()
        }
        None => false,
    }
}

#[test]
fn money_flow_then_reveal_pauses_with_three_entries() {
    let (mut engine, clock) = engine();
    play(
        &mut engine,
        "Somchai",
        500_000,
        scenario(
            "scenario-a",
            vec![
                Step::new("a-0", 1, StepType::Action, "a0", Alignment::Good, 3_000),
                Step::new("a-1", 2, StepType::MoneyFlow, "a0", Alignment::Evil, 4_000).with_money_change(-200_000),
                Step::new("a-2", 3, StepType::Reveal, "a2", Alignment::Good, 5_000),
            ],
        ),
    );

    assert!(fire_next(&mut engine, &clock));
    assert!(fire_next(&mut engine, &clock));

    let state = engine.state();
    assert_eq!(state.user_profile.money_remaining, 300_000);
    assert_eq!(state.status, SimulationStatus::Paused);
    assert_eq!(state.timeline.len(), 3);
    assert!(!engine.has_pending_timer());
}

#[test]
fn two_small_drains_report_seventeen_percent() {
    let (mut engine, clock) = engine();
    play(
        &mut engine,
        "Wanna",
        10_000,
        scenario(
            "scenario-b",
            vec![
                Step::new("b-0", 1, StepType::MoneyFlow, "a0", Alignment::Evil, 1_000).with_money_change(-850),
                Step::new("b-1", 2, StepType::MoneyFlow, "a0", Alignment::Evil, 1_000).with_money_change(-850),
            ],
        ),
    );
    engine.run_to_completion(&clock, 10);

    assert_eq!(engine.state().status, SimulationStatus::Completed);
    assert_eq!(engine.state().user_profile.money_remaining, 8_300);
    let loss = engine.loss_report();
    assert_eq!(loss.lost, 1_700);
    assert_eq!(loss.loss_percent, 17);
}

#[test]
fn transitioning_then_evil_shows_evil_identity() {
    let (mut engine, clock) = engine();
    let a0 = AgentId::from("a0");
    play(
        &mut engine,
        "Nok",
        5_000,
        scenario(
            "scenario-c",
            vec![
                Step::new("c-0", 1, StepType::Transformation, "a0", Alignment::Transitioning, 1_000),
                Step::new("c-1", 2, StepType::Dialogue, "a0", Alignment::Evil, 1_000),
                Step::new("c-2", 3, StepType::Education, "a2", Alignment::Good, 1_000),
            ],
        ),
    );
    assert!(fire_next(&mut engine, &clock));

    assert_eq!(engine.state().agent_alignments.get(&a0), Some(&Alignment::Evil));

    let registry = AgentRegistry::builtin();
    let base = registry.get(&a0).unwrap();
    let evil = registry.evil_variant(&a0).unwrap();
    let shown = engine.get_agent_display_data(base);
    assert_eq!(shown.alignment, Alignment::Evil);
    assert_eq!(shown.name, evil.name);
    assert_eq!(shown.avatar, evil.avatar);
    assert_ne!(shown.name, base.name);
}

#[test]
fn reset_mid_playback_leaves_no_live_timer() {
    let (mut engine, clock) = engine();
    play(
        &mut engine,
        "Dao",
        9_000,
        scenario(
            "scenario-d",
            vec![
                Step::new("d-0", 1, StepType::Transformation, "a0", Alignment::Evil, 1_000),
                Step::new("d-1", 2, StepType::MoneyFlow, "a0", Alignment::Evil, 1_000).with_money_change(-1_000),
                Step::new("d-2", 3, StepType::Dialogue, "a0", Alignment::Evil, 1_000),
                Step::new("d-3", 4, StepType::Education, "a2", Alignment::Good, 1_000),
            ],
        ),
    );
    assert!(fire_next(&mut engine, &clock));
    assert!(fire_next(&mut engine, &clock));
    assert_eq!(engine.state().status, SimulationStatus::Playing);
    assert_eq!(engine.state().current_step_index, Some(2));

    engine.reset();
    let after_reset = engine.snapshot();
    assert_eq!(after_reset.current_step_index, None);
    assert!(after_reset.timeline.is_empty());
    assert!(after_reset.agent_alignments.is_empty());
    assert!(!engine.has_pending_timer());

    clock.advance(60_000);
    assert!(!engine.poll());
    assert_eq!(engine.snapshot(), after_reset);
}

#[test]
fn builtin_call_center_plays_to_completion() {
    let catalog = ScenarioCatalog::builtin().unwrap();
    let scenario = catalog.require("call-center-001").unwrap();
    let (mut engine, clock) = engine();
    engine.load_and_play(Arc::clone(&scenario));

    engine.run_to_completion(&clock, 1_000);

    let state = engine.state();
    assert_eq!(state.status, SimulationStatus::Completed);
    assert_eq!(state.timeline.len(), scenario.len());
    assert_eq!(state.user_profile.money, 500_000);
    assert_eq!(state.user_profile.money_remaining, 0);
    assert_eq!(engine.loss_report().loss_percent, 100);
    // The reveal restored everyone.
    assert!(state.agent_alignments.values().all(|a| *a == Alignment::Good));

    let summary = engine.summary().unwrap();
    assert_eq!(summary.scenario_id, "call-center-001");
    assert_eq!(summary.event_count, scenario.len());
    assert_eq!(summary.educational_points.len(), scenario.educational_points.len());
    assert!(summary.duration_ms.unwrap() >= i64::try_from(scenario.total_duration_ms()).unwrap());
}

#[test]
fn builtin_qr_scam_pauses_once_on_reveal() {
    let catalog = ScenarioCatalog::builtin().unwrap();
    let scenario = catalog.require("qr-scam-001").unwrap();
    let reveal_index = scenario.steps.iter().position(Step::is_reveal).unwrap();
    let (mut engine, clock) = engine();
    engine.load_and_play(scenario);

    while engine.state().status == SimulationStatus::Playing {
        assert!(fire_next(&mut engine, &clock));
    }
    assert_eq!(engine.state().status, SimulationStatus::Paused);
    assert_eq!(engine.state().current_step_index, Some(reveal_index));
    assert_eq!(engine.state().user_profile.money_remaining, 30_000 - 1_700);
    assert_eq!(engine.state().alignment_of(&AgentId::from("a5")), Alignment::Good);

    engine.resume();
    engine.run_to_completion(&clock, 100);
    assert_eq!(engine.state().status, SimulationStatus::Completed);
    assert_eq!(engine.loss_report().loss_percent, 6);
}

#[test]
fn english_locale_fills_timeline_in_english() {
    let clock = Arc::new(ManualClock::new());
    let config = EngineConfig {
        locale: fraudsim::Locale::En,
        ..EngineConfig::default()
    };
    let mut engine = SimulationEngine::with_clock(config, AgentRegistry::builtin(), clock.clone()).unwrap();
    let catalog = ScenarioCatalog::builtin().unwrap();
    let scenario = catalog.require("qr-scam-001").unwrap();
    let first = scenario.steps[0].content.en.clone();
    engine.load_and_play(scenario);

    assert_eq!(engine.state().timeline[0].content, first);
}

#[test]
fn replay_after_completion_starts_a_new_run() {
    let (mut engine, clock) = engine();
    let script = scenario(
        "replay",
        vec![Step::new("r-0", 1, StepType::MoneyFlow, "a0", Alignment::Evil, 100).with_money_change(-400)],
    );
    play(&mut engine, "Ton", 1_000, Arc::clone(&script));
    engine.run_to_completion(&clock, 10);
    let first_run = engine.state().run_id;
    assert_eq!(engine.state().user_profile.money_remaining, 600);

    engine.start_setup();
    engine.load_and_play(script);
    assert_ne!(engine.state().run_id, first_run);
    assert_eq!(engine.state().timeline.len(), 1);
    assert_eq!(engine.state().user_profile.money_remaining, 600);
    assert_eq!(engine.state().completed_at, None);
}
