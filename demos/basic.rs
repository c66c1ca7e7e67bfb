//! Basic example walking a coordinator through a registry flap.
//!
//! A consumer briefly loses a dependency and regains it within the
//! cool-down window, so no sidecar update goes out. Only the removal that
//! sticks past the window is published.

use sidecar_sync::{
    dump_snapshot, CallModel, CallModels, Coordinator, FnHandler, LoggingHandler,
};
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn consumer(services: &[&str]) -> CallModels {
    [(
        "frontend".to_string(),
        CallModel::new("frontend").with_consumes(services.iter().copied()),
    )]
    .into_iter()
    .collect()
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let coordinator = Coordinator::builder()
        .with_suppression_window(Duration::from_secs(2))
        .with_handler(LoggingHandler::new().with_hosts())
        .with_handler(FnHandler(|event: &sidecar_sync::ConfigEvent| {
            println!("-> {} {}", event.kind, event.full_name());
        }))
        .build()
        .expect("default configuration is valid");

    println!("=== Sidecar Sync Example ===\n");
    println!("Suppression window: 2s\n");

    println!("Initial sync: frontend consumes billing and greeter");
    coordinator.update_source("registry", consumer(&["billing", "greeter"]));
    println!("   {:?}\n", coordinator.run(true));

    println!("Registry flap: billing disappears...");
    coordinator.update_source("registry", consumer(&["greeter"]));
    println!("   {:?}", coordinator.run(false));
    println!("...and comes back");
    coordinator.update_source("registry", consumer(&["billing", "greeter"]));
    println!("   {:?}\n", coordinator.run(false));

    println!("Waiting out the window, then billing goes away for good");
    thread::sleep(Duration::from_millis(2100));
    coordinator.update_source("registry", consumer(&["greeter"]));
    println!("   {:?}\n", coordinator.run(false));

    match dump_snapshot(&coordinator.snapshot()) {
        Ok(yaml) => println!("{yaml}"),
        Err(e) => eprintln!("dump failed: {e}"),
    }

    let metrics = coordinator.metrics().snapshot();
    println!("=== Example Complete ===");
    println!(
        "runs: {}, events: {}, withheld changes: {}",
        metrics.total_runs(),
        metrics.total_events(),
        metrics.changes_withheld
    );
}
