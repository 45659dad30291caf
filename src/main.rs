use anyhow::Context;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::env;
use tracing::{info, warn};
use vaccine_distribution::io::demand;
use vaccine_distribution::io::loader;
use vaccine_distribution::io::reporting::{self, OrderRecord};
use vaccine_distribution::{
    logging, DistributionConfig, DistributionEngine, DistributionError, OrderStatus,
};

fn main() -> anyhow::Result<()> {
    logging::init();
    info!("=== Vaccine Distribution Simulation ===");

    // 1. SETUP CONFIGURATION
    // Usage: vaccine-distribution [warehouses.json] [days] [output.csv]
    let args: Vec<String> = env::args().collect();
    let warehouse_file = args.get(1).map_or("data/warehouses.json", String::as_str);
    let days: usize = match args.get(2) {
        Some(raw) => raw.parse().with_context(|| format!("invalid day count '{raw}'"))?,
        None => 30,
    };
    let output_file = args.get(3).map_or("order_history.csv", String::as_str);

    let seed = env::var("VACCINE_SIM_SEED")
        .ok()
        .map(|raw| raw.parse::<u64>())
        .transpose()
        .context("VACCINE_SIM_SEED must be an unsigned integer")?;
    let config = DistributionConfig {
        seed,
        ..DistributionConfig::default()
    };

    // 2. LOAD WAREHOUSES
    let warehouses = loader::load_warehouses(warehouse_file)
        .with_context(|| format!("failed to load warehouses from {warehouse_file}"))?;
    let area = demand::bounding_box(&warehouses).context("warehouse file lists no warehouses")?;
    let mut engine = DistributionEngine::with_config(config, warehouses);

    // 3. GENERATE DEMAND
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let schedule = demand::generate_daily_order_counts(&mut rng, days, 8.0, 3.0)?;
    info!(?schedule, "daily order counts generated");

    // 4. RUN SIMULATION
    let mut history = Vec::new();
    for &order_count in &schedule {
        for _ in 0..order_count {
            let quota = engine.available_quantity() / 10;
            let Some(request) = demand::random_order_request(&mut rng, area, quota) else {
                break;
            };
            match engine.create_order(request.quantity, request.location) {
                Ok(_) => {}
                Err(DistributionError::InvalidArgument(reason)) => {
                    warn!(%reason, "order skipped");
                }
                Err(err) => return Err(err.into()),
            }
        }

        engine.finish_day()?;
        history.extend(engine.previous_day_orders().iter().map(OrderRecord::from_order));
    }

    // 5. EXPORT RESULTS
    reporting::write_order_log(output_file, &history)
        .with_context(|| format!("failed to write {output_file}"))?;

    // 6. SUMMARY
    let dispatched = history
        .iter()
        .filter(|r| r.status == OrderStatus::Dispatched)
        .count();
    let rejected = history.len() - dispatched;
    let expired: u32 = engine
        .warehouses()
        .iter()
        .flat_map(|w| w.expired_batches().iter().map(|b| b.quantity()))
        .sum();

    println!("\n=== Summary after {} days ===", engine.current_day());
    println!("Orders dispatched: {}", dispatched);
    println!("Orders rejected:   {}", rejected);
    println!("Units expired:     {}", expired);
    println!("Units available:   {}", engine.available_quantity());
    println!("Order log written to ./{}", output_file);

    Ok(())
}
