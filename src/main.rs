use gdal::cpl::CslStringList;
use gdal::raster::RasterBand;
use gdal::{Dataset, DriverManager};
use clap::{Arg, Command};
use std::error::Error;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Instant;
use num_cpus;
use console::Term;

use dem_uncertainty::convolution::{ConvolutionResult, WindowConvolver};
use dem_uncertainty::error::ModelError;
use dem_uncertainty::field::RandomFieldGenerator;
use dem_uncertainty::kernel::{Operator, StatisticalKernel};
use dem_uncertainty::raster;
use dem_uncertainty::text;

fn main() -> Result<(), Box<dyn Error>> {
  let start_time = Instant::now();

  // Define the command line arguments
  let app = Command::new("DEM Uncertainty Modeller")
    .version(env!("CARGO_PKG_VERSION"))
    .author("Lukas Graf <graflukas@web.de>")
    //.about("The program generates uncertainty scenarios for a gridded dataset.")
    .arg(
      Arg::new("input_file")
        .short('i')
        .long("input-file")
        .required(true)
        .help("Specify the input file path"),
    )
    .arg(
      Arg::new("output_dir")
        .short('o')
        .long("output-dir")
        .required(true)
        .help("Specify the directory where the scenarios are saved"),
    )
    .arg(
      Arg::new("realizations")
        .short('n')
        .long("realizations")
        .default_value("10")
        .help("Specify the number of scenarios (realizations) to generate"),
    )
    .arg(
      Arg::new("operator")
        .long("operator")
        .default_value("mean")
        .help("Specify the statistical operator (mean, median, min, max, majority)"),
    )
    .arg(
      Arg::new("kernel_size_x")
        .short('x')
        .long("kernel-size-x")
        .default_value("9")
        .help("Specify the kernel size in grid cells in x direction"),
    )
    .arg(
      Arg::new("kernel_size_y")
        .short('y')
        .long("kernel-size-y")
        .default_value("9")
        .help("Specify the kernel size in grid cells in y direction"),
    )
    .arg(
      Arg::new("shift")
        .short('s')
        .long("shift")
        .default_value("1")
        .help("Specify the kernel shift in grid cells (accepted for compatibility, currently has no effect)"),
    )
    .arg(
      Arg::new("mean")
        .long("mean")
        .default_value("0.0")
        .help("Specify the mean of the Gaussian distribution"),
    )
    .arg(
      Arg::new("std")
        .long("std")
        .default_value("1.0")
        .help("Specify the standard deviation of the Gaussian distribution"),
    )
    .arg(
      Arg::new("minval")
        .long("minval")
        .help("Truncate the standard normal draw at this lower bound (requires --maxval)"),
    )
    .arg(
      Arg::new("maxval")
        .long("maxval")
        .help("Truncate the standard normal draw at this upper bound (requires --minval)"),
    )
    .arg(
      Arg::new("jobs")
        .short('j')
        .long("jobs")
        .help("Specify the number of threads to use (if omitted, all available processors are used)"),
    );

  let line = "-".repeat(72);
  let dline = "=".repeat(72);

  println!("\n\
  {}\n\
  {}\n\
  Tool for modelling uncertainty of gridded elevation data using Gaussian\n\
  random fields and statistical convolution (Monte-Carlo approach).\n\n\
  Author:\n{}\n\
  {}\n",
  format!("{} {}", text::highlight("DEM Uncertainty Modeller"), app.get_version().unwrap()),
  line,
  app.get_author().unwrap(),
  dline);

  // Parse the command line arguments
  let matches = app.get_matches();

  let input_file = matches.get_one::<String>("input_file").unwrap();
  let output_dir = matches.get_one::<String>("output_dir").unwrap();

  // Parsing and validating 'realizations'
  let n_realizations = match matches.get_one::<String>("realizations").unwrap().parse::<usize>() {
    Ok(value) if value > 0 => {
      if value > 1000 {
        println!(
          "{}: 'realizations' value is unusually high ({}). This might cause long computation times.\n",
          text::warning("Warning"),
          value
        );
      }
      value
    }
    Ok(_) => {
      exit_with_error(&ModelError::NoRealizations.to_string());
    }
    Err(_) => {
      exit_with_error("'realizations' must be a valid positive integer.");
    }
  };

  let operator = Operator::from_name(matches.get_one::<String>("operator").unwrap())
    .unwrap_or_else(|err| exit_with_error(&err.to_string()));

  let kernel_size_x = matches.get_one::<String>("kernel_size_x").unwrap().parse::<usize>()
    .unwrap_or_else(|_| exit_with_error("'kernel-size-x' must be a valid positive integer."));
  let kernel_size_y = matches.get_one::<String>("kernel_size_y").unwrap().parse::<usize>()
    .unwrap_or_else(|_| exit_with_error("'kernel-size-y' must be a valid positive integer."));

  let shift = matches.get_one::<String>("shift").unwrap().parse::<usize>()
    .unwrap_or_else(|_| exit_with_error("'shift' must be a valid positive integer."));

  let mean = matches.get_one::<String>("mean").unwrap().parse::<f64>()
    .unwrap_or_else(|_| exit_with_error("'mean' must be a valid number."));
  let std = matches.get_one::<String>("std").unwrap().parse::<f64>()
    .unwrap_or_else(|_| exit_with_error("'std' must be a valid number."));
  if !(std > 0.0) {
    exit_with_error(&ModelError::NonPositiveStd(std).to_string());
  }

  let minval = matches.get_one::<String>("minval").map(|v| {
    v.parse::<f64>()
      .unwrap_or_else(|_| exit_with_error("'minval' must be a valid number."))
  });
  let maxval = matches.get_one::<String>("maxval").map(|v| {
    v.parse::<f64>()
      .unwrap_or_else(|_| exit_with_error("'maxval' must be a valid number."))
  });
  if minval.is_some() != maxval.is_some() {
    exit_with_error(&ModelError::MismatchedBounds.to_string());
  }

  let num_procs = num_cpus::get() as usize;
  let jobs = if let Some(jobs_str) = matches.get_one::<String>("jobs") {
    // Attempt to convert the string to usize
    match jobs_str.parse::<usize>() {
      Ok(max_jobs) if max_jobs > 0 => std::cmp::min(max_jobs, num_procs), // If valid and > 0, use the smaller value
      Ok(_) => {
        println!("{}: 'jobs' value must be greater than 0. Using the number of processors.\n", text::warning("Warning"));
        num_procs
      },
      Err(_) => {
        println!("{}: 'jobs' value is not a valid number. Using the number of processors.\n", text::warning("Warning"));
        num_procs
      }
    }
  } else {
    // If no value is provided, default to using the number of processors
    num_procs
  };

  if !Path::new(output_dir).is_dir() {
    exit_with_error(&format!("Output directory does not exist: {}", output_dir));
  }

  println!("The following scenarios will be generated [{}]:", n_realizations);
  println!("{}", line);
  let file_stem = Path::new(input_file)
    .file_stem()
    .and_then(|stem| stem.to_str())
    .unwrap_or_else(|| exit_with_error(&format!("Invalid input file name: {}", input_file)));
  for i in 0..n_realizations {
    println!("Scenario {}\n  {}", i + 1,
      text::light(format!("└─{} {}/{}_scenario_{}.tif", text::ARROW, output_dir, file_stem, i + 1)));
  }
  println!("{}\n", dline);

  let mut part_time = Instant::now();

  // Open the input raster file
  let dataset = Dataset::open(input_file)
    .unwrap_or_else(|_| {
      exit_with_error(&format!("Failed to open input file: {}", input_file));
    });

  let geotransform = dataset.geo_transform().unwrap();
  let projection = dataset.projection();

  let rasterband: RasterBand = dataset.rasterband(1).unwrap();
  let no_data = rasterband.no_data_value();

  let width = dataset.raster_size().0;
  let height = dataset.raster_size().1;

  let raster_params = raster::RasterParams {
    width: width,
    height: height,
    origin: [geotransform[0], geotransform[3]],
    resolution: [geotransform[1], geotransform[5]],
    nodata: no_data.unwrap_or(-9999.0),
  };

  if kernel_size_x > height || kernel_size_y > width {
    let err = ModelError::KernelTooLarge {
      kx: kernel_size_x,
      ky: kernel_size_y,
      rows: height,
      cols: width,
    };
    exit_with_error(&err.to_string());
  }

  let kernel = StatisticalKernel::new(kernel_size_x, kernel_size_y, raster_params.nodata, operator)
    .unwrap_or_else(|err| exit_with_error(&err.to_string()));

  let grid = raster::Grid::<f32>::from_raster_band(raster_params, &rasterband)
    .unwrap_or_else(|err| exit_with_error(&err));

  let elapsed_time = part_time.elapsed();
  println!("{} Input raster ({} x {}) read in {:.2} seconds.", text::success(text::CHECK), width, height, elapsed_time.as_secs_f64());
  part_time = Instant::now();

  print!("Generating scenarios using the {} operator...", kernel.operator().name());
  io::stdout().flush().unwrap();

  let count = Arc::new(Mutex::new(0));
  let (tx, rx) = mpsc::channel();
  let mut handles = vec![];

  // Spawn multiple threads for parallel realization processing.
  // Each thread handles the realizations that match its thread ID using a
  // modulo operation and owns its random number generator state, so no
  // random state is shared between workers. Each random field is smoothed
  // by the window convolution and the result is sent back to the main
  // thread through an MPSC channel together with its realization index.
  for tid in 0..jobs {

    let tx = tx.clone();
    let count_clone = Arc::clone(&count);

    let handle = thread::spawn(move || {
      let generator = RandomFieldGenerator::new(height, width);
      let convolver = WindowConvolver::new(shift);

      for realization in (0..n_realizations).filter(|r| r % jobs == tid) {
        let result: Result<ConvolutionResult, ModelError> = generator
          .sample(mean, std, minval, maxval)
          .and_then(|field| convolver.convolve(&field, &kernel));
        tx.send((realization, result)).unwrap();

        let mut num = count_clone.lock().unwrap();
        *num += 1;

        let term = Term::stdout();
        term.clear_line().unwrap();
        print!("\rGenerating scenarios using the {} operator... {:.0}%", kernel.operator().name(), *num as f32 / n_realizations as f32 * 100.0);
        io::stdout().flush().unwrap();
      }
    });
    handles.push(handle);
  }
  // Wait for all threads to finish
  for handle in handles {
    handle.join().unwrap();
  }

  // Receive the smoothed fields from the threads in realization order
  let mut convolutions: Vec<Option<ConvolutionResult>> = Vec::with_capacity(n_realizations);
  convolutions.resize_with(n_realizations, || None);

  for _ in 0..n_realizations {
    let (realization, result) = rx.recv().unwrap();
    match result {
      Ok(convolution) => {
        convolutions[realization] = Some(convolution);
      }
      Err(err) => {
        println!();
        exit_with_error(&err.to_string());
      }
    }
  }

  let elapsed_time = part_time.elapsed();
  println!("\r\x1B[K{} Scenarios generated in {:.2} seconds.", text::success(text::CHECK), elapsed_time.as_secs_f64());
  part_time = Instant::now();

  // The convolution is not defined at the raster border, so the original
  // grid is cropped by this offset before the smoothed field is added.
  let offset_x = (kernel_size_x / 2).saturating_sub(1);
  let offset_y = (kernel_size_y / 2).saturating_sub(1);

  // For each realization, crop the original grid, add the smoothed field to
  // form the scenario and write it as a GeoTIFF file. The projection and
  // geotransform from the input dataset are applied to each output.
  for (index, convolution) in convolutions.iter().enumerate() {

    let convolution = convolution.as_ref().unwrap();
    if convolution.empty_windows > 0 {
      println!(
        "{}: {} window(s) of scenario {} contained no valid data and were set to NaN.",
        text::warning("Warning"),
        convolution.empty_windows,
        index + 1
      );
    }

    let scenario = grid.add_field(&convolution.values, offset_x, offset_y);
    let out_width = scenario.params().width;
    let out_height = scenario.params().height;

    let result = scenario.to_gdal_buffer();
    match result {
      Ok(mut buffer) => {
        // output
        let driver = DriverManager::get_driver_by_name("GTiff").unwrap();
        let options = CslStringList::from_iter(["TILED=YES", "BLOCKXSIZE=16", "BLOCKYSIZE=16"]);

        let file_name = format!("{}/{}_scenario_{}.tif", output_dir, file_stem, index + 1);

        let mut ds = driver
          .create_with_band_type_with_options::<f32, _>(
            &file_name,
            out_width,
            out_height,
            1,
            &options,
          ).expect("Failed to create GeoTIFF file.");

        ds.set_projection(&projection)?;
        ds.set_geo_transform(&geotransform).expect("Failed to set geotransform");

        let mut band1 = ds.rasterband(1).unwrap();
        band1.set_no_data_value(Some(raster_params.nodata))?;
        band1.write((0, 0), (out_width, out_height), &mut buffer).expect("Failed to write data");
        band1.compute_raster_min_max(true)?;
      }
      Err(err) => {
        println!("Failed to create output raster: {}", err);
      }
    }
  }
  let elapsed_time = part_time.elapsed();
  println!("{} Output files written in {:.2} seconds.", text::success(text::CHECK), elapsed_time.as_secs_f64());

  let elapsed_time = start_time.elapsed();
  println!("{}", line);
  println!("{}", text::success("Scenario generation completed successfully."));
  println!("Total elapsed time: {:.2} seconds.", elapsed_time.as_secs_f64());
  println!("");

  Ok(())
}

// Print a styled error message and terminate.
fn exit_with_error(message: &str) -> ! {
  let output = format!("{}: {}", text::error("Error"), message);
  eprintln!("{}\n", text::bold(output));
  std::process::exit(1);
}
