use std::env;
use std::path::PathBuf;

use tiny_rasterizer::app;

/// Value following flag `args[i]`.
fn flag_value(args: &[String], i: usize) -> Result<&str, Box<dyn std::error::Error>> {
    return match args.get(i + 1) {
        Some(value) => Ok(value.as_str()),
        None => Err(format!("missing value after {}", args[i]).into()),
    };
}

#[show_image::main]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Default values.
    let mut params = app::Params::default();

    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-m" => {
                params.model_path = PathBuf::from(flag_value(&args, i)?);
                i += 1;
            }
            "-t" => {
                params.texture_path = Some(PathBuf::from(flag_value(&args, i)?));
                i += 1;
            }
            "-o" => {
                params.output_path = PathBuf::from(flag_value(&args, i)?);
                i += 1;
            }
            "-d" => {
                params.depth_output_path = Some(PathBuf::from(flag_value(&args, i)?));
                i += 1;
            }
            "-j" => {
                params.threads = flag_value(&args, i)?.parse()?;
                i += 1;
            }
            "-s" => {
                params.shader = flag_value(&args, i)?.parse()?;
                i += 1;
            }
            "--show" => params.show = true,
            "--fps" => params.print_fps = true,
            other => log::warn!("ignoring unknown argument {other}"),
        }
        i += 1;
    }

    app::run(params)?;

    return Ok(());
}
