//! Sleipnir vanity SSH key generator CLI
//!
//! Usage:
//!   sleipnir -p cool                  # Find a key containing "cool"
//!   sleipnir -p MENG -l end -c        # Find a key ending with "MENG"
//!   sleipnir -p a,b -s -o keys.txt    # Stream keys into keys.txt until Ctrl+C

use std::process;

use clap::Parser;
use log::{info, warn};

use sleipnir::output::{append_record, format_record};
use sleipnir::{CancelToken, Config, FoundResult, SearchConfig, SearchError, WorkerPool};

fn main() {
    let config = Config::parse();

    let default_filter = if config.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    // Validate configuration
    let search = match config.validate().and_then(|_| config.search_config()) {
        Ok(search) => search,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(1);
        }
    };

    print_banner(&config, &search);

    if search.streaming && config.output.is_none() {
        warn!("streaming mode without --output: found keys are only printed to the terminal");
    }

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        handler_token.cancel();
    }) {
        eprintln!("Error setting Ctrl-C handler: {}", e);
        process::exit(1);
    }

    println!("Searching... (Press Ctrl+C to stop)\n");

    let outcome = run(&config, &search, cancel);

    match outcome {
        Ok(Summary { found, trials, elapsed, rate }) => {
            println!("\n--- Final Statistics ---");
            println!("Total keys generated: {}", format_number(trials));
            println!("Total matches found:  {}", found);
            println!("Time elapsed:         {:.2}s", elapsed);
            println!("Average speed:        {}/s", format_number(rate as u64));
        }
        Err(e) => {
            eprintln!("Search failed: {}", e);
            process::exit(2);
        }
    }
}

struct Summary {
    found: u64,
    trials: u64,
    elapsed: f64,
    rate: f64,
}

fn run(
    config: &Config,
    search: &SearchConfig,
    cancel: CancelToken,
) -> Result<Summary, SearchError> {
    // The device is initialized before any CPU worker starts so a broken
    // GPU setup fails fast.
    #[cfg(feature = "gpu")]
    let engine = if config.gpu_enabled() {
        Some(gpu_engine(config, search)?)
    } else {
        None
    };

    #[cfg_attr(not(feature = "gpu"), allow(unused_mut))]
    let mut pool = WorkerPool::start(search, cancel)?;

    #[cfg(feature = "gpu")]
    if let Some(engine) = engine {
        pool.spawn_gpu(engine)?;
    }

    info!("{} worker(s) running", pool.num_workers());

    let found = if search.streaming {
        pool.stream(|result| report(config, &result))?
    } else {
        match pool.wait()? {
            Some(result) => {
                report(config, &result);
                1
            }
            None => {
                println!("\nStopped by user.");
                0
            }
        }
    };

    Ok(Summary {
        found,
        trials: pool.counter().trials(),
        elapsed: pool.elapsed().as_secs_f64(),
        rate: pool.keys_per_second(),
    })
}

#[cfg(feature = "gpu")]
fn gpu_engine(
    config: &Config,
    search: &SearchConfig,
) -> Result<sleipnir::GpuBatchEngine<sleipnir::gpu::OpenClDevice>, SearchError> {
    use sleipnir::gpu::{list_devices, OpenClDevice};
    use sleipnir::{GpuBatchEngine, GpuError};

    let devices = list_devices();
    if devices.is_empty() {
        return Err(GpuError::DeviceNotFound.into());
    }
    for (index, name) in devices.iter().enumerate() {
        info!("OpenCL GPU {}: {}", index, name);
    }

    let device = OpenClDevice::new(config.gpu_device_index(), &config.gpu_kernel)?;
    Ok(GpuBatchEngine::new(device, search.batch_size, search.pattern_set())?)
}

fn report(config: &Config, result: &FoundResult) {
    println!("\n{}", format_record(result, config.verbose));

    if let Some(path) = &config.output {
        if let Err(e) = append_record(path, result, config.verbose) {
            warn!("failed to write key to {}: {}", path.display(), e);
        }
    }
}

fn print_banner(config: &Config, search: &SearchConfig) {
    let patterns = search.pattern_set();
    let expected = patterns.expected_trials();

    println!("Sleipnir Vanity SSH Key Generator");
    println!("=================================");
    println!("Patterns:   {}", search.patterns.join(", "));
    println!(
        "Location:   {} ({})",
        search.location,
        if search.case_sensitive {
            "case sensitive"
        } else {
            "case insensitive"
        }
    );
    println!("Difficulty: {}", expected.description());
    println!("Expected:   {} tries", expected);
    println!("Workers:    {}", search.workers);
    if config.gpu_enabled() {
        println!(
            "GPU:        device {} ({} seeds per batch)",
            config.gpu_device_index(),
            search.batch_size
        );
    }
    println!(
        "Mode:       {}",
        if search.streaming { "streaming" } else { "single key" }
    );
    println!();
}

fn format_number(n: u64) -> String {
    if n >= 1_000_000_000 {
        format!("{:.2}B", n as f64 / 1_000_000_000.0)
    } else if n >= 1_000_000 {
        format!("{:.2}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.2}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}
