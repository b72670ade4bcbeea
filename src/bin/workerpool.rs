use std::path::PathBuf;
use std::process::exit;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};
use log::{error, info};

use workerpool::array_sum;
use workerpool::profile::{ConsoleLog, Profiler, TraceFile};
use workerpool::{PoolConfig, Result, WorkerPool};

const DEFAULT_LEN: usize = 10_000_000;

#[derive(Parser)]
#[command(name = "workerpool", version, about = "Worker pool demos and array-sum benchmark")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sum an array sequentially and on the pool, and compare
    Sum {
        /// Number of elements to sum
        #[arg(long, default_value_t = DEFAULT_LEN, value_name = "N")]
        len: usize,

        /// Worker count; defaults to the number of CPUs
        #[arg(long, default_value_t = 0, value_name = "THREADS")]
        threads: usize,

        /// Write a Chrome trace of the run to this file
        #[arg(long, value_name = "FILE")]
        trace: Option<PathBuf>,
    },
    /// Run a few sleeping tasks with completion callbacks
    Demo {
        /// Worker count
        #[arg(long, default_value_t = 2, value_name = "THREADS")]
        threads: usize,
    },
}

fn main() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        error!("{}", e);
        exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    info!("workerpool {}", env!("CARGO_PKG_VERSION"));
    match cli.command {
        Command::Sum {
            len,
            threads,
            trace,
        } => run_sum(len, threads, trace),
        Command::Demo { threads } => run_demo(threads),
    }
}

fn run_sum(len: usize, threads: usize, trace: Option<PathBuf>) -> Result<()> {
    let profiler = match trace {
        Some(path) => Profiler::new(TraceFile::new(path)),
        None => Profiler::new(ConsoleLog),
    };

    let nums: Arc<[i32]> = (0..len).map(|i| (i % 1000) as i32 + 1).collect();
    println!("N is {len}");

    let mut startup = profiler.scope("pool startup");
    let pool = PoolConfig::default().capacity(threads).build()?;
    while !pool.are_workers_idle() {
        thread::sleep(Duration::from_millis(1));
    }
    startup.stop();

    let mut timer = profiler.scope("parallel sum");
    let parallel = array_sum::parallel(&pool, Arc::clone(&nums))?;
    let parallel_time = timer.stop();

    let mut timer = profiler.scope("sequential sum");
    let sequential = array_sum::sequential(&nums);
    let sequential_time = timer.stop();

    drop(pool);
    profiler.finish()?;

    println!("parallel:   {parallel} in {parallel_time:?}");
    println!("sequential: {sequential} in {sequential_time:?}");
    if parallel != sequential {
        error!("Sum mismatch: parallel {parallel} != sequential {sequential}");
        exit(1);
    }
    println!("Calculation verified");
    Ok(())
}

fn sleeper(label: &'static str, tenths: u64) -> impl FnOnce() + Send + 'static {
    move || {
        println!("Task {label} started on {}", current_name());
        thread::sleep(Duration::from_millis(tenths * 100));
        println!("Task {label} finished on {}", current_name());
    }
}

fn callback(label: &'static str) -> impl FnOnce() + Send + 'static {
    move || println!("Callback for task {label} on {}", current_name())
}

fn current_name() -> String {
    thread::current().name().unwrap_or("<unnamed>").to_owned()
}

fn run_demo(threads: usize) -> Result<()> {
    let pool = WorkerPool::new(threads)?;

    pool.submit(sleeper("A", 1))?;
    pool.submit_with_callback(sleeper("1", 2), callback("1"))?;
    pool.submit_with_callback(sleeper("2", 1), callback("2"))?;
    let third = pool.submit_with_callback(sleeper("3", 3), callback("3"))?;
    let (a, b) = (10, 20);
    let addition = pool.submit(move || println!("{a} + {b} = {}", a + b))?;

    third.wait()?;
    addition.wait()?;
    println!("Task 3 and the addition are done");

    // Remaining tasks are flushed here.
    drop(pool);
    println!("All tasks completed");
    Ok(())
}
