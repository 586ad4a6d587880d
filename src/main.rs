// Packed upper-triangle Pearson correlations of the rows of a TSV matrix.

use std::{env, error::Error, time::Instant};

use log::{info, warn};

use triucorr::io::{input_basename, load_matrix, write_tar_gz, write_triangle, OutputLayout};
use triucorr::{correlation_upper_triangle, CorrConfig};

const USAGE: &str = "Usage: triucorr <input_file> [num_threads] [--layout pairs|packed] [--time]\n\
num_threads: number of threads to use (default: all available)\n\
--layout: pairs writes one row_a/row_b/r line per pair, packed writes the flat upper triangle\n\
--time: enable detailed timing output";

struct Args {
    file_path: String,
    num_threads: Option<usize>,
    layout: OutputLayout,
    time_tracking: bool,
}

fn parse_args() -> Result<Args, Box<dyn Error>> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        return Err(USAGE.into());
    }

    let mut num_threads = None;
    let mut time_tracking = false;
    let mut layout = OutputLayout::Pairs;

    let mut i = 2;
    while i < args.len() {
        let arg = &args[i];
        if arg == "--time" {
            time_tracking = true;
            i += 1;
        } else if arg == "--layout" {
            let value = args.get(i + 1).ok_or("Missing value for --layout")?;
            layout = value.parse().map_err(|_| "Invalid --layout value")?;
            i += 2;
        } else if let Some(value) = arg.strip_prefix("--layout=") {
            layout = value.parse().map_err(|_| "Invalid --layout value")?;
            i += 1;
        } else if let Ok(threads) = arg.parse::<usize>() {
            num_threads = Some(threads);
            i += 1;
        } else {
            return Err(format!("Unknown argument: {}\n{}", arg, USAGE).into());
        }
    }

    Ok(Args {
        file_path: args[1].clone(),
        num_threads,
        layout,
        time_tracking,
    })
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args()?;

    let mut config = CorrConfig::new();
    match args.num_threads {
        Some(threads) if threads > 0 => {
            config = config.with_num_threads(threads);
            info!("Using {} threads.", threads);
        }
        _ => info!("Using all available CPU cores."),
    }

    let load_start = Instant::now();
    let matrix = load_matrix(&args.file_path)?;
    let load_duration = load_start.elapsed();
    if args.time_tracking {
        info!("Data loaded in {:.3} seconds.", load_duration.as_secs_f64());
    }

    let (n_vars, n_obs) = matrix.data.dim();
    info!("Matrix dimensions: {} rows x {} columns", n_vars, n_obs);
    if n_vars < 2 {
        return Err("Input must contain at least two rows to correlate".into());
    }
    if n_obs < 2 {
        warn!("Only one observation per row; all coefficients will be NaN");
    }

    let calc_start = Instant::now();
    info!("Computing Pearson correlations...");
    let triangle = correlation_upper_triangle(&matrix.data, &config)?;
    let calc_duration = calc_start.elapsed();
    if args.time_tracking {
        info!(
            "{} Pearson correlations calculated in {:.3} seconds.",
            triangle.len(),
            calc_duration.as_secs_f64()
        );
    }

    let output_start = Instant::now();
    let mut tsv_buf = Vec::<u8>::new();
    write_triangle(&mut tsv_buf, &matrix.row_ids, &triangle, args.layout)?;

    let base = input_basename(&args.file_path);
    let tar_gz_path = format!("{}_pearson_triu.tar.gz", base);
    let tsv_name = format!("{}_pearson_triu.tsv", base);
    write_tar_gz(&tar_gz_path, &tsv_name, tsv_buf)?;
    let output_duration = output_start.elapsed();
    info!("Wrote {} ({} layout).", tar_gz_path, args.layout);

    if args.time_tracking {
        let total_duration = load_duration + calc_duration + output_duration;
        info!("Data loading:            {:8.3} seconds", load_duration.as_secs_f64());
        info!("Correlation calculation: {:8.3} seconds", calc_duration.as_secs_f64());
        info!("Output writing:          {:8.3} seconds", output_duration.as_secs_f64());
        info!("Total time:              {:8.3} seconds", total_duration.as_secs_f64());
    }

    Ok(())
}
