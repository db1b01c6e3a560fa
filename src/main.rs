use mediapreview::cli::Args;
use mediapreview::config::{PathConfig, PreviewConfig};
use mediapreview::{Info, Options, System};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{debug, info};
use std::path::Path;

fn init_logger(args: &Args, path_config: &PathConfig) -> Result<()> {
    // 0 (default) = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ (-vvv) = trace
    let log_level = match args.verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    if let Some(log_path_opt) = &args.log_file {
        let log_path = log_path_opt
            .as_ref()
            .cloned()
            .unwrap_or_else(|| path_config.config_dir().join("mediapreview.log"));
        if let Some(dir) = log_path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
            }
        }
        let file = std::fs::File::create(&log_path)
            .with_context(|| format!("Failed to create log file: {}", log_path.display()))?;

        env_logger::Builder::new()
            .filter_level(log_level)
            .format_timestamp_millis()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();

        info!("Logging to file: {} (level: {:?})", log_path.display(), log_level);
    } else {
        // Console logging (respects RUST_LOG if set)
        let default_level = match args.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
            .format_timestamp_millis()
            .init();
    }
    Ok(())
}

fn print_info(path: &Path, info: &Info) {
    println!("{}", path.display());
    for (i, video) in info.video.iter().enumerate() {
        println!(
            "  video[{}]: {}x{} (pixel aspect {:.3})",
            i, video.size.width, video.size.height, video.pixel_aspect
        );
    }
    if let Some(range) = info.video_time {
        println!("  video time: {:.3}s + {:.3}s", range.start, range.duration);
    }
    if info.has_audio() {
        println!(
            "  audio: {} ch @ {} Hz",
            info.audio.channels, info.audio.sample_rate
        );
    }
    if let Some(range) = info.audio_time {
        println!("  audio time: {:.3}s + {:.3}s", range.start, range.duration);
    }
    for (key, value) in &info.tags {
        println!("  {}: {}", key, value);
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let path_config = PathConfig::from_env_and_cli(None);
    init_logger(&args, &path_config)?;
    debug!("Command-line args: {:?}", args);

    let config_path = args.config.clone().unwrap_or_else(|| path_config.config_file());
    info!("Config path: {}", config_path.display());
    let config = PreviewConfig::load_or_default(&config_path)?;

    let system = System::with_default_readers(&config).into_handle();
    let options = Options::new();
    let path = args.file_path.as_path();

    // Submit everything up front; the three workers run in parallel
    let info_request = system.get_info(path, &options);
    let thumbnail_request = (args.out.is_some() || args.is_default_run())
        .then(|| system.get_thumbnail(path, args.height, args.time, &options));
    let waveform_request = args
        .waveform
        .map(|size| system.get_waveform(path, size, args.time_range(), &options));

    let media_info = info_request.future.wait();
    if args.info || args.is_default_run() {
        print_info(path, &media_info);
    }

    if let Some(request) = thumbnail_request {
        let image = request.future.wait();
        if image.is_empty() {
            bail!("No thumbnail produced for {}", path.display());
        }
        println!("thumbnail: {}x{}", image.width(), image.height());
        if let Some(out) = &args.out {
            let rgba = image
                .to_rgba_image()
                .context("Thumbnail buffer has unexpected size")?;
            rgba.save(out)
                .with_context(|| format!("Failed to write {}", out.display()))?;
            println!("wrote {}", out.display());
        }
    }

    if let Some(request) = waveform_request {
        let size = request.size;
        let mesh = request.future.wait();
        if mesh.is_empty() {
            bail!("No waveform produced for {}", path.display());
        }
        let (top, bottom) = mesh
            .column_extent(0.0, size.width as f32)
            .unwrap_or_default();
        println!(
            "waveform: {}x{}, {} triangles, extent {:.1}..{:.1}",
            size.width,
            size.height,
            mesh.triangles.len(),
            top,
            bottom
        );
    }

    let cache = system.cache();
    debug!(
        "Cache: {} entries ({:.1}%), info hit rate {:.2}",
        cache.size(),
        cache.percentage(),
        cache.info_stats().hit_rate()
    );
    Ok(())
}
