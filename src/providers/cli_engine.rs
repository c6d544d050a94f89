//! Synthesis provider backed by local command-line engines.
//!
//! Speech is rendered to WAV by espeak-ng and transcoded by ffmpeg into the
//! requested container. Jobs queue for a small pool of worker threads; the
//! finished audio is stored in the job's output bucket and the task record
//! is updated so callers can poll it. Finished tasks are forgotten once
//! their retention period has passed.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::SynthesisConfig;
use crate::error::{ProviderErrorKind, RelayError, RelayResult};
use crate::executor::{run_command, sanitize_output, SubprocessBuilder};

use super::traits::{ObjectStore, SynthesisProvider};
use super::types::{
    Engine, OutputFormat, SynthesisJob, SynthesisTask, TaskStatus, TextType, Voice, VoiceCatalog,
};

/// Lines of engine stderr kept in a failure reason.
const REASON_MAX_LINES: usize = 5;

struct TaskEntry {
    task: SynthesisTask,
    /// Set when the task reaches a terminal status.
    finished_at: Option<Instant>,
}

type TaskMap = Arc<Mutex<HashMap<String, TaskEntry>>>;

/// A queued job.
struct Work {
    job: SynthesisJob,
    task_id: String,
    key: String,
}

/// Synthesis provider that shells out to espeak-ng and ffmpeg.
pub struct CliSynthesisProvider {
    config: Arc<SynthesisConfig>,
    storage: Arc<dyn ObjectStore>,
    tasks: TaskMap,
    queue: Mutex<Sender<Work>>,
    receiver: Arc<Mutex<Receiver<Work>>>,
    /// Worker threads started so far, never more than `max_workers`.
    workers: Mutex<usize>,
}

/// Scratch files removed when the guard goes out of scope.
struct TempFiles {
    paths: Vec<PathBuf>,
}

impl TempFiles {
    fn new() -> Self {
        Self { paths: Vec::new() }
    }

    fn track(&mut self, path: PathBuf) -> PathBuf {
        self.paths.push(path.clone());
        path
    }
}

impl Drop for TempFiles {
    fn drop(&mut self) {
        for path in &self.paths {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove temp file"),
            }
        }
    }
}

fn recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn update_task(tasks: &TaskMap, task_id: &str, status: TaskStatus, reason: Option<String>) {
    if let Some(entry) = recover(tasks).get_mut(task_id) {
        entry.task.status = status;
        entry.task.status_reason = reason;
        if matches!(status, TaskStatus::Completed | TaskStatus::Failed) {
            entry.finished_at = Some(Instant::now());
        }
    }
}

/// Drop finished tasks older than `retention`.
fn sweep_finished(tasks: &mut HashMap<String, TaskEntry>, retention: Duration) {
    let before = tasks.len();
    tasks.retain(|_, entry| match entry.finished_at {
        Some(finished) => finished.elapsed() < retention,
        None => true,
    });
    let evicted = before - tasks.len();
    if evicted > 0 {
        debug!(evicted, remaining = tasks.len(), "Evicted finished synthesis tasks");
    }
}

impl CliSynthesisProvider {
    pub fn new(config: SynthesisConfig, storage: Arc<dyn ObjectStore>) -> Self {
        info!(
            espeak = %config.espeak_bin.display(),
            ffmpeg = %config.ffmpeg_bin.display(),
            engine = %config.engine,
            max_workers = config.max_workers,
            "Command-line synthesis provider configured"
        );
        let (sender, receiver) = mpsc::channel();
        Self {
            config: Arc::new(config),
            storage,
            tasks: Arc::new(Mutex::new(HashMap::new())),
            queue: Mutex::new(sender),
            receiver: Arc::new(Mutex::new(receiver)),
            workers: Mutex::new(0),
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_seconds)
    }

    /// Start another worker unless the pool is full.
    ///
    /// Fails only when no worker exists and none can be started, since
    /// queued work would otherwise never run.
    fn ensure_worker(&self) -> RelayResult<()> {
        let mut workers = recover(&self.workers);
        if *workers >= self.config.max_workers.max(1) {
            return Ok(());
        }

        let config = Arc::clone(&self.config);
        let storage = Arc::clone(&self.storage);
        let tasks = Arc::clone(&self.tasks);
        let receiver = Arc::clone(&self.receiver);
        let spawned = thread::Builder::new()
            .name(format!("synthesis-worker-{}", *workers))
            .spawn(move || worker_loop(&config, storage.as_ref(), &tasks, &receiver));

        match spawned {
            Ok(_) => {
                *workers += 1;
                debug!(workers = *workers, "Synthesis worker started");
                Ok(())
            }
            Err(e) if *workers == 0 => Err(RelayError::engine_failed(format!(
                "Failed to start synthesis worker: {}",
                e
            ))),
            Err(e) => {
                warn!(error = %e, workers = *workers, "Could not grow synthesis pool");
                Ok(())
            }
        }
    }
}

/// Run queued jobs until the provider, and with it the queue, is dropped.
fn worker_loop(
    config: &SynthesisConfig,
    storage: &dyn ObjectStore,
    tasks: &TaskMap,
    receiver: &Mutex<Receiver<Work>>,
) {
    loop {
        let next = recover(receiver).recv();
        match next {
            Ok(work) => run_job(config, storage, tasks, &work),
            Err(_) => break,
        }
    }
    debug!("Synthesis worker exiting");
}

/// Render `job` to encoded audio bytes.
fn render(config: &SynthesisConfig, job: &SynthesisJob, task_id: &str) -> RelayResult<Vec<u8>> {
    let timeout = Duration::from_secs(config.timeout_seconds);
    let mut scratch = TempFiles::new();
    let text_path = scratch.track(config.temp_dir.join(format!("relay_{}.txt", task_id)));
    let wav_path = scratch.track(config.temp_dir.join(format!("relay_{}.wav", task_id)));
    let out_path = scratch.track(
        config
            .temp_dir
            .join(format!("relay_{}.{}", task_id, job.output_format.extension())),
    );

    // Text goes through a file so it is never parsed as engine flags
    fs::write(&text_path, &job.text)?;

    let mut espeak = SubprocessBuilder::new(&config.espeak_bin).timeout(timeout);
    if job.text_type == TextType::Ssml {
        espeak = espeak.arg("-m");
    }
    let result = espeak
        .arg("-v")
        .arg(&job.voice_id)
        .arg("-w")
        .arg(path_arg(&wav_path))
        .arg("-f")
        .arg(path_arg(&text_path))
        .run()?;
    if !result.success {
        return Err(RelayError::engine_failed(format!(
            "espeak-ng exited with {:?}: {}",
            result.exit_code,
            sanitize_output(&result.stderr, REASON_MAX_LINES)
        )));
    }

    let codec = match job.output_format {
        OutputFormat::Mp3 => "libmp3lame",
        OutputFormat::OggVorbis => "libvorbis",
    };
    let result = SubprocessBuilder::new(&config.ffmpeg_bin)
        .timeout(timeout)
        .args(["-y", "-loglevel", "error", "-i"])
        .arg(path_arg(&wav_path))
        .args(["-c:a", codec])
        .arg(path_arg(&out_path))
        .run()?;
    if !result.success {
        return Err(RelayError::engine_failed(format!(
            "ffmpeg exited with {:?}: {}",
            result.exit_code,
            sanitize_output(&result.stderr, REASON_MAX_LINES)
        )));
    }

    Ok(fs::read(&out_path)?)
}

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

fn run_job(config: &SynthesisConfig, storage: &dyn ObjectStore, tasks: &TaskMap, work: &Work) {
    let Work { job, task_id, key } = work;
    update_task(tasks, task_id, TaskStatus::InProgress, None);

    let outcome = render(config, job, task_id)
        .and_then(|audio| storage.put_object(&job.output_bucket, key, &audio).map(|_| audio.len()));

    match outcome {
        Ok(bytes) => {
            info!(task_id = %task_id, key = %key, bytes, "Synthesis task completed");
            update_task(tasks, task_id, TaskStatus::Completed, None);
        }
        Err(e) => {
            error!(task_id = %task_id, error = %e, "Synthesis task failed");
            update_task(tasks, task_id, TaskStatus::Failed, Some(e.to_string()));
        }
    }
}

impl SynthesisProvider for CliSynthesisProvider {
    fn start_synthesis_task(&self, job: &SynthesisJob) -> RelayResult<SynthesisTask> {
        self.ensure_worker()?;

        let task_id = Uuid::new_v4().to_string();
        let key = format!("{}.{}", task_id, job.output_format.extension());
        let task = SynthesisTask {
            task_id: task_id.clone(),
            output_uri: self.storage.object_uri(&job.output_bucket, &key),
            status: TaskStatus::Scheduled,
            status_reason: None,
            output_format: job.output_format,
            voice_id: job.voice_id.clone(),
            creation_time: Utc::now(),
        };

        {
            let mut tasks = recover(&self.tasks);
            sweep_finished(
                &mut tasks,
                Duration::from_secs(self.config.task_retention_seconds),
            );
            tasks.insert(
                task_id.clone(),
                TaskEntry {
                    task: task.clone(),
                    finished_at: None,
                },
            );
        }

        let work = Work {
            job: job.clone(),
            task_id: task_id.clone(),
            key,
        };
        if recover(&self.queue).send(work).is_err() {
            recover(&self.tasks).remove(&task_id);
            return Err(RelayError::engine_failed("Synthesis queue is closed"));
        }

        debug!(
            task_id = %task_id,
            voice = %job.voice_id,
            format = job.output_format.as_str(),
            "Synthesis task queued"
        );
        Ok(task)
    }

    fn get_synthesis_task(&self, task_id: &str) -> RelayResult<SynthesisTask> {
        recover(&self.tasks)
            .get(task_id)
            .map(|entry| entry.task.clone())
            .ok_or_else(|| RelayError::Provider {
                kind: ProviderErrorKind::UnknownTask {
                    task_id: task_id.to_string(),
                },
            })
    }

    fn describe_voices(&self, engine: Engine) -> RelayResult<VoiceCatalog> {
        let result = run_command(&self.config.espeak_bin, &["--voices"], self.timeout())?;
        if !result.success {
            return Err(RelayError::engine_failed(format!(
                "espeak-ng --voices exited with {:?}: {}",
                result.exit_code,
                sanitize_output(&result.stderr, REASON_MAX_LINES)
            )));
        }

        let catalog = parse_voice_listing(&result.stdout, self.config.engine).for_engine(engine);
        debug!(engine = %engine, count = catalog.voices.len(), "Described voices");
        Ok(catalog)
    }
}

fn gender_name(age_gender: &str) -> &'static str {
    match age_gender.rsplit('/').next() {
        Some("M") => "Male",
        Some("F") => "Female",
        _ => "Neutral",
    }
}

/// Parse the table printed by `espeak-ng --voices`.
///
/// ```text
/// Pty Language       Age/Gender VoiceName          File                 Other Languages
///  5  en-gb           --/M      English_(Great_Britain) gmw/en          (en 2)
/// ```
///
/// Every voice is reported as supporting `engine`.
pub fn parse_voice_listing(listing: &str, engine: Engine) -> VoiceCatalog {
    let mut voices = Vec::new();

    for line in listing.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 5 || fields[0] == "Pty" {
            continue;
        }
        if fields[0].parse::<u32>().is_err() {
            continue;
        }

        let language = fields[1];
        let name = fields[3].replace('_', " ");
        let additional_language_codes = fields[5..]
            .iter()
            .map(|f| f.trim_matches(|c| c == '(' || c == ')'))
            .filter(|f| !f.is_empty() && f.parse::<u32>().is_err())
            .map(str::to_string)
            .collect();

        voices.push(Voice {
            gender: gender_name(fields[2]).to_string(),
            id: language.to_string(),
            language_code: language.to_string(),
            language_name: name.clone(),
            name,
            additional_language_codes,
            supported_engines: vec![engine],
        });
    }

    VoiceCatalog { voices }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::InMemoryObjectStore;
    use std::io::Read;
    use std::os::unix::fs::PermissionsExt;
    use std::time::Instant;
    use tempfile::TempDir;

    const LISTING: &str = "\
Pty Language       Age/Gender VoiceName          File                 Other Languages
 5  af              --/M      Afrikaans          gmw/af
 2  en-gb           --/M      English_(Great_Britain) gmw/en          (en 2)
 5  en-us           --/F      English_(America)  gmw/en-US            (en 3)
";

    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn config(dir: &Path, espeak: PathBuf, ffmpeg: PathBuf) -> SynthesisConfig {
        SynthesisConfig {
            engine: Engine::Neural,
            espeak_bin: espeak,
            ffmpeg_bin: ffmpeg,
            timeout_seconds: 10,
            temp_dir: dir.to_path_buf(),
            max_workers: 2,
            task_retention_seconds: 3600,
        }
    }

    fn job(format: OutputFormat) -> SynthesisJob {
        SynthesisJob {
            text: "<speak>hello</speak>".to_string(),
            text_type: TextType::Ssml,
            voice_id: "en-gb".to_string(),
            output_format: format,
            output_bucket: "speech".to_string(),
            engine: Engine::Neural,
        }
    }

    fn wait_for_terminal(provider: &CliSynthesisProvider, task_id: &str) -> SynthesisTask {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            let task = provider.get_synthesis_task(task_id).unwrap();
            if matches!(task.status, TaskStatus::Completed | TaskStatus::Failed) {
                return task;
            }
            assert!(Instant::now() < deadline, "task never finished");
            thread::sleep(Duration::from_millis(20));
        }
    }

    #[test]
    fn test_parse_voice_listing() {
        let catalog = parse_voice_listing(LISTING, Engine::Neural);
        assert_eq!(catalog.voices.len(), 3);

        let gb = &catalog.voices[1];
        assert_eq!(gb.id, "en-gb");
        assert_eq!(gb.gender, "Male");
        assert_eq!(gb.name, "English (Great Britain)");
        assert_eq!(gb.additional_language_codes, vec!["en"]);
        assert_eq!(gb.supported_engines, vec![Engine::Neural]);

        assert_eq!(catalog.voices[2].gender, "Female");
        assert!(catalog.voices[0].additional_language_codes.is_empty());
    }

    #[test]
    fn test_parse_ignores_noise() {
        let catalog = parse_voice_listing("garbage\n\nPty Language\n", Engine::Standard);
        assert!(catalog.voices.is_empty());
    }

    #[test]
    fn test_unknown_task() {
        let dir = TempDir::new().unwrap();
        let provider = CliSynthesisProvider::new(
            config(dir.path(), "espeak-ng".into(), "ffmpeg".into()),
            Arc::new(InMemoryObjectStore::new()),
        );
        assert!(matches!(
            provider.get_synthesis_task("missing"),
            Err(RelayError::Provider {
                kind: ProviderErrorKind::UnknownTask { .. }
            })
        ));
    }

    #[test]
    fn test_job_completes_and_stores_audio() {
        let dir = TempDir::new().unwrap();
        let espeak = write_script(
            dir.path(),
            "fake-espeak",
            "while [ $# -gt 0 ]; do if [ \"$1\" = \"-w\" ]; then shift; printf RIFF > \"$1\"; fi; shift; done",
        );
        let ffmpeg = write_script(dir.path(), "fake-ffmpeg", "for a; do out=$a; done; printf OggS > \"$out\"");

        let storage = Arc::new(InMemoryObjectStore::new());
        storage.create_bucket_if_absent("speech").unwrap();
        let provider = CliSynthesisProvider::new(config(dir.path(), espeak, ffmpeg), storage.clone());

        let task = provider.start_synthesis_task(&job(OutputFormat::OggVorbis)).unwrap();
        assert!(task.output_uri.contains(&format!("{}.ogg", task.task_id)));

        let finished = wait_for_terminal(&provider, &task.task_id);
        assert_eq!(finished.status, TaskStatus::Completed);

        let mut body = Vec::new();
        storage
            .get_object("speech", &format!("{}.ogg", task.task_id))
            .unwrap()
            .read_to_end(&mut body)
            .unwrap();
        assert_eq!(body, b"OggS");

        // Scratch files are cleaned up
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("relay_"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_engine_failure_marks_task_failed() {
        let dir = TempDir::new().unwrap();
        let espeak = write_script(dir.path(), "broken-espeak", "echo 'voice not found' >&2; exit 1");
        let provider = CliSynthesisProvider::new(
            config(dir.path(), espeak, "ffmpeg".into()),
            Arc::new(InMemoryObjectStore::new()),
        );

        let task = provider.start_synthesis_task(&job(OutputFormat::Mp3)).unwrap();
        let finished = wait_for_terminal(&provider, &task.task_id);
        assert_eq!(finished.status, TaskStatus::Failed);
        assert!(finished
            .status_reason
            .unwrap_or_default()
            .contains("voice not found"));
    }

    #[test]
    fn test_finished_tasks_are_evicted_after_retention() {
        let dir = TempDir::new().unwrap();
        let espeak = write_script(dir.path(), "broken-espeak", "exit 1");
        let mut config = config(dir.path(), espeak, "ffmpeg".into());
        config.task_retention_seconds = 0;
        let provider = CliSynthesisProvider::new(config, Arc::new(InMemoryObjectStore::new()));

        let mut finished = Vec::new();
        for _ in 0..20 {
            let task = provider.start_synthesis_task(&job(OutputFormat::Mp3)).unwrap();
            wait_for_terminal(&provider, &task.task_id);
            finished.push(task.task_id);
        }

        // Each submission sweeps everything that finished before it
        assert_eq!(recover(&provider.tasks).len(), 1);
        assert!(provider.get_synthesis_task(&finished[0]).is_err());
        assert!(provider.get_synthesis_task(&finished[19]).is_ok());
    }

    #[test]
    fn test_running_tasks_survive_sweep() {
        let mut tasks = HashMap::new();
        let task = |id: &str| SynthesisTask {
            task_id: id.to_string(),
            output_uri: format!("memory://speech/{}.ogg", id),
            status: TaskStatus::InProgress,
            status_reason: None,
            output_format: OutputFormat::OggVorbis,
            voice_id: "en-gb".to_string(),
            creation_time: Utc::now(),
        };
        tasks.insert(
            "running".to_string(),
            TaskEntry {
                task: task("running"),
                finished_at: None,
            },
        );
        tasks.insert(
            "done".to_string(),
            TaskEntry {
                task: task("done"),
                finished_at: Some(Instant::now()),
            },
        );

        sweep_finished(&mut tasks, Duration::from_secs(3600));
        assert_eq!(tasks.len(), 2);

        sweep_finished(&mut tasks, Duration::ZERO);
        assert!(tasks.contains_key("running"));
        assert!(!tasks.contains_key("done"));
    }

    #[test]
    fn test_worker_pool_is_bounded() {
        let dir = TempDir::new().unwrap();
        let espeak = write_script(dir.path(), "slow-espeak", "sleep 0.1; exit 1");
        let mut config = config(dir.path(), espeak, "ffmpeg".into());
        config.max_workers = 1;
        let provider = CliSynthesisProvider::new(config, Arc::new(InMemoryObjectStore::new()));

        let ids: Vec<String> = (0..4)
            .map(|_| provider.start_synthesis_task(&job(OutputFormat::Mp3)).unwrap().task_id)
            .collect();
        assert_eq!(*recover(&provider.workers), 1);

        // Queued jobs still run, one at a time
        for id in &ids {
            assert_eq!(wait_for_terminal(&provider, id).status, TaskStatus::Failed);
        }
        assert_eq!(*recover(&provider.workers), 1);
    }

    #[test]
    fn test_describe_voices_filters_engine() {
        let dir = TempDir::new().unwrap();
        let listing_path = dir.path().join("listing.txt");
        fs::write(&listing_path, LISTING).unwrap();
        let espeak = write_script(
            dir.path(),
            "listing-espeak",
            &format!("cat '{}'", listing_path.display()),
        );
        let provider = CliSynthesisProvider::new(
            config(dir.path(), espeak, "ffmpeg".into()),
            Arc::new(InMemoryObjectStore::new()),
        );

        assert_eq!(provider.describe_voices(Engine::Neural).unwrap().voices.len(), 3);
        assert!(provider.describe_voices(Engine::Standard).unwrap().voices.is_empty());
    }
}
