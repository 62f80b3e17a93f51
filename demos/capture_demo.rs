//! Demonstration of the typing load pipeline.
//!
//! This example shows how to:
//! 1. Feed a raw key event stream through the collector
//! 2. Track a session until the stop key is released
//! 3. Extract features from the captured session
//! 4. Classify them with a linear model
//! 5. Compare against features simulated from the same text
//!
//! Run with: cargo run --example capture_demo

use std::io::Cursor;
use std::sync::atomic::AtomicBool;

use typing_load_agent::{
    classifier::{observations, Classifier, LinearModel},
    collector::{Collector, CollectorConfig, RawKeyEvent},
    core::{extract_features, run_listener, SessionState, SimulatedSource},
    stats::CollectionStats,
};

/// Build a scripted session: "hello world" with a hesitation and a typo.
fn scripted_stream() -> String {
    let mut events = Vec::new();
    let mut t = 1_700_000_000.0;

    let mut type_key = |key: &str, gap: f64, hold: f64, events: &mut Vec<RawKeyEvent>| {
        t += gap;
        events.push(RawKeyEvent::press(key, t));
        t += hold;
        events.push(RawKeyEvent::release(key, t));
    };

    for c in "hello".chars() {
        type_key(&c.to_string(), 0.12, 0.09, &mut events);
    }
    type_key("Key.space", 0.9, 0.08, &mut events);
    for c in "wrold".chars() {
        type_key(&c.to_string(), 0.15, 0.11, &mut events);
    }
    for _ in 0..4 {
        type_key("Key.backspace", 0.2, 0.07, &mut events);
    }
    for c in "orld".chars() {
        type_key(&c.to_string(), 0.14, 0.1, &mut events);
    }
    type_key("Key.esc", 0.6, 0.1, &mut events);

    events
        .iter()
        .filter_map(|e| serde_json::to_string(e).ok())
        .collect::<Vec<_>>()
        .join("\n")
}

fn main() {
    println!("Typing Load Agent - Capture Demo");
    println!("================================");
    println!();

    let stats = CollectionStats::new();
    let mut collector = Collector::new(CollectorConfig::default());
    if let Err(e) = collector.start(Cursor::new(scripted_stream())) {
        eprintln!("Error starting collector: {e}");
        return;
    }
    let Some(receiver) = collector.receiver().cloned() else {
        eprintln!("Collector has no event channel");
        return;
    };

    let mut state = SessionState::new("high");
    let running = AtomicBool::new(true);
    let exit = run_listener(&receiver, &mut state, &running);
    collector.stop();

    let session = state.finish();
    stats.record_key_events(session.events().len() as u64);
    stats.record_session();
    println!("Session ended: {exit:?}");
    println!("  Events captured: {}", session.events().len());
    println!();

    let features = extract_features(&session);
    println!("Captured Features:");
    println!("  Average dwell: {:.3}s", features.avg_dwell);
    println!("  Average flight: {:.3}s", features.avg_flight);
    println!("  Speed: {:.2} chars/sec", features.speed);
    println!("  Pauses: {}", features.pauses);
    println!("  Errors: {}", features.errors);
    println!();

    let model = LinearModel::from_json(
        r#"{"weights": {"avg_dwell": 5.0, "avg_flight": 5.0, "speed": -0.5,
                        "pauses": 0.5, "errors": 0.5}, "bias": -1.0}"#,
    );
    match model.and_then(|m| m.classify(&features.record())) {
        Ok(class) => println!("Predicted cognitive load: {class}"),
        Err(e) => eprintln!("Classification failed: {e}"),
    }
    for observation in observations(&features) {
        println!("  - {}", observation.message());
    }
    println!();

    let mut simulated = SimulatedSource::seeded(2024);
    match simulated.simulate("hello world", "high") {
        Ok(sim) => {
            println!("Simulated Features for the same text:");
            println!("  Average dwell: {:.3}s", sim.avg_dwell);
            println!("  Average flight: {:.3}s", sim.avg_flight);
            println!("  Speed: {:.2} chars/sec", sim.speed);
            println!("  Pauses: {}", sim.pauses);
            println!("  Errors: {}", sim.errors);
        }
        Err(e) => eprintln!("Simulation failed: {e}"),
    }

    println!();
    println!("{}", stats.summary());
    println!();
    println!("Demo complete!");
}
