// Headless batch runner
//
//   whisper-batch batch.json          run the job configs in the file
//   whisper-batch <files or dirs>...  run media with the last used preset
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use whisper_batch_lib::advisories::advise;
use whisper_batch_lib::file_manager::{get_preferences, read_json_file};
use whisper_batch_lib::gpu::gpu_available;
use whisper_batch_lib::logging::{cleanup_old_logs, init_logging};
use whisper_batch_lib::media::{collect_media_files, file_info_detailed};
use whisper_batch_lib::{
    initialize_app_data, EngineConfig, JobConfig, Preferences, Preset, QueueEvent, QueueManager,
    QueueSettings,
};

async fn load_configs(args: &[String], prefs: &Preferences) -> Result<Vec<JobConfig>, String> {
    if let [single] = args {
        let path = Path::new(single);
        if path.extension().map_or(false, |ext| ext.eq_ignore_ascii_case("json")) {
            return read_json_file(path);
        }
    }

    let inputs: Vec<PathBuf> = args
        .iter()
        .map(|arg| std::path::absolute(arg).unwrap_or_else(|_| PathBuf::from(arg)))
        .collect();
    let preset = Preset::from_name(&prefs.last_preset);
    let files = collect_media_files(&inputs);
    if files.is_empty() {
        return Err("No supported media files found".to_string());
    }

    let mut configs = Vec::with_capacity(files.len());
    for file in files {
        if let Ok(info) = file_info_detailed(&file).await {
            let duration = info
                .details
                .as_ref()
                .and_then(|d| d.duration_formatted.clone())
                .unwrap_or_else(|| "unknown length".to_string());
            info!("Found {:?} ({}, {}, {})", file, info.format, info.size_formatted, duration);
        }
        let mut config = JobConfig::from_preset(file, preset);
        config.output_location = prefs.default_output_location();
        configs.push(config);
    }
    Ok(configs)
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    cleanup_old_logs();
    if let Err(e) = initialize_app_data() {
        warn!("Failed to initialize app data: {}", e);
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("usage: whisper-batch <batch.json | media files or directories...>");
        return ExitCode::from(2);
    }

    let prefs = get_preferences().unwrap_or_else(|e| {
        warn!("Using default preferences: {}", e);
        Default::default()
    });

    let configs = match load_configs(&args, &prefs).await {
        Ok(configs) => configs,
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", e);
            return ExitCode::from(2);
        }
    };

    let has_gpu = gpu_available();
    for config in &configs {
        for advisory in advise(config, has_gpu) {
            println!("[{:?}] {:?}: {}", advisory.level, config.input_path, advisory.message);
        }
    }

    let engine = EngineConfig::from_preferences(&prefs);
    let settings = QueueSettings::from(&prefs);
    let (queue, mut events) = QueueManager::new(engine, settings, tokio::runtime::Handle::current());

    let ids = match queue.submit_batch(configs) {
        Ok(ids) => ids,
        Err(e) => {
            error!("Batch rejected: {}", e);
            eprintln!("Batch rejected: {}", e);
            return ExitCode::from(2);
        }
    };
    if ids.is_empty() {
        println!("Nothing to do");
        return ExitCode::SUCCESS;
    }
    info!("Submitted {} job(s)", ids.len());

    while let Some(event) = events.recv().await {
        match event {
            QueueEvent::JobStarted { job_id, command } => println!("[{}] started: {}", job_id, command),
            QueueEvent::Progress { job_id, progress } => {
                if let Some(percent) = progress.percent {
                    println!("[{}] {:.0}%", job_id, percent);
                }
            }
            QueueEvent::JobFinished {
                job_id,
                state,
                output_paths,
                error,
                ..
            } => {
                println!("[{}] {:?} {:?}", job_id, state, output_paths);
                if let Some(text) = error {
                    println!("[{}] {}", job_id, text);
                }
            }
            QueueEvent::SpeakerReview {
                job_id,
                transcript,
                speakers,
            } => {
                let labels: Vec<&str> = speakers.labels().collect();
                println!("[{}] speakers in {:?}: {}", job_id, transcript, labels.join(", "));
            }
            QueueEvent::QueueDrained => break,
            QueueEvent::JobQueued { .. } | QueueEvent::Log { .. } => {}
        }
    }

    let counts = queue.counts();
    info!("Batch finished: {:?}", counts);
    let all_ok = queue
        .snapshot()
        .iter()
        .all(|job| job.state.is_success());

    if all_ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
