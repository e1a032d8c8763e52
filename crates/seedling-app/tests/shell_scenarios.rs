use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use seedling_app::{
    AppError, ConfirmationHost, ConfirmationSurface, DetailView, HostHandles, LabelMenu,
    Notifier, Shell, ShellCommand, ShellMessage, StatusSurface, SurfaceId, TaskbarProgress,
    VolumeProbe, inbox,
};
use seedling_app::bridge::FINISHED_TITLE;
use seedling_app::disk_guard::LOW_DISK_TITLE;
use seedling_app::shell::{ENGINE_LOST_MESSAGE, forward_engine_events};
use seedling_app::admission::AdmissionRequest;
use seedling_config::{Label, LabelDraft, SettingsService, ShellSettings};
use seedling_engine::EngineHandle;
use seedling_events::{
    JobHandle, JobId, JobMetadata, JobSnapshot, JobState, LabelId, SessionEvent, SessionStats,
    TransferRates, TransferTotals,
};
use seedling_telemetry::Metrics;
use seedling_torrent_core::{AddJob, MagnetLink, Metainfo, RemoveJob, TransferEngine};
use tokio::sync::RwLock;
use tokio::time::{sleep, timeout};

#[derive(Debug, Clone, PartialEq)]
enum DetailCall {
    Refresh(Vec<JobSnapshot>),
    Reset,
}

#[derive(Default)]
struct Recorder {
    details: Mutex<Vec<DetailCall>>,
    job_counts: Mutex<Vec<usize>>,
    dht: Mutex<Vec<Option<u64>>>,
    rates: Mutex<Vec<TransferRates>>,
    fatal: Mutex<Vec<String>>,
    progress: Mutex<Vec<Option<u8>>>,
    notifications: Mutex<Vec<(String, String)>>,
    opened: Mutex<Vec<(SurfaceId, AddJob)>>,
    metadata: Mutex<Vec<JobId>>,
    closed: Mutex<usize>,
    menus: Mutex<Vec<Vec<String>>>,
    free_ratio: Mutex<Option<f64>>,
}

impl Recorder {
    fn details(&self) -> Vec<DetailCall> {
        self.details.lock().expect("lock").clone()
    }

    fn notifications(&self) -> Vec<(String, String)> {
        self.notifications.lock().expect("lock").clone()
    }

    fn opened(&self) -> Vec<(SurfaceId, AddJob)> {
        self.opened.lock().expect("lock").clone()
    }
}

struct Host(Arc<Recorder>);

struct Surface(Arc<Recorder>);

impl DetailView for Host {
    fn refresh(&self, jobs: &[JobSnapshot]) {
        self.0
            .details
            .lock()
            .expect("lock")
            .push(DetailCall::Refresh(jobs.to_vec()));
    }

    fn reset(&self) {
        self.0.details.lock().expect("lock").push(DetailCall::Reset);
    }
}

impl StatusSurface for Host {
    fn job_count(&self, count: usize) {
        self.0.job_counts.lock().expect("lock").push(count);
    }

    fn dht_nodes(&self, nodes: Option<u64>) {
        self.0.dht.lock().expect("lock").push(nodes);
    }

    fn transfer_rates(&self, rates: TransferRates) {
        self.0.rates.lock().expect("lock").push(rates);
    }

    fn fatal(&self, message: &str) {
        self.0.fatal.lock().expect("lock").push(message.to_string());
    }
}

impl TaskbarProgress for Host {
    fn progress(&self, percent: Option<u8>) {
        self.0.progress.lock().expect("lock").push(percent);
    }
}

impl Notifier for Host {
    fn notify(&self, title: &str, body: &str) {
        self.0
            .notifications
            .lock()
            .expect("lock")
            .push((title.to_string(), body.to_string()));
    }
}

impl ConfirmationHost for Host {
    fn open(&self, id: SurfaceId, draft: &AddJob) -> Box<dyn ConfirmationSurface> {
        self.0.opened.lock().expect("lock").push((id, draft.clone()));
        Box::new(Surface(self.0.clone()))
    }
}

impl ConfirmationSurface for Surface {
    fn metadata_found(&self, id: JobId, _metadata: &JobMetadata) {
        self.0.metadata.lock().expect("lock").push(id);
    }

    fn close(&self) {
        *self.0.closed.lock().expect("lock") += 1;
    }
}

impl LabelMenu for Host {
    fn rebuild(&self, labels: &[Label]) {
        self.0
            .menus
            .lock()
            .expect("lock")
            .push(labels.iter().map(|label| label.name.clone()).collect());
    }
}

impl VolumeProbe for Host {
    fn free_ratio(&self, _path: &Path) -> Option<f64> {
        *self.0.free_ratio.lock().expect("lock")
    }
}

fn handles(recorder: &Arc<Recorder>) -> HostHandles {
    let host = Arc::new(Host(recorder.clone()));
    HostHandles {
        detail: host.clone(),
        status: host.clone(),
        taskbar: host.clone(),
        notifier: host.clone(),
        confirmations: host.clone(),
        label_menu: host.clone(),
        volume_probe: Some(host),
    }
}

#[derive(Default)]
struct RecordingEngine {
    submitted: RwLock<Vec<AddJob>>,
    removed: RwLock<Vec<(JobId, RemoveJob)>>,
    paused: RwLock<Vec<JobId>>,
    resumed: RwLock<Vec<JobId>>,
    searches: RwLock<Vec<Vec<JobId>>>,
}

#[async_trait]
impl TransferEngine for RecordingEngine {
    async fn submit(&self, job: AddJob) -> anyhow::Result<()> {
        self.submitted.write().await.push(job);
        Ok(())
    }

    async fn remove(&self, id: JobId, options: RemoveJob) -> anyhow::Result<()> {
        self.removed.write().await.push((id, options));
        Ok(())
    }

    async fn pause(&self, id: JobId) -> anyhow::Result<()> {
        self.paused.write().await.push(id);
        Ok(())
    }

    async fn resume(&self, id: JobId) -> anyhow::Result<()> {
        self.resumed.write().await.push(id);
        Ok(())
    }

    async fn request_metadata_search(&self, ids: Vec<JobId>) -> anyhow::Result<()> {
        self.searches.write().await.push(ids);
        Ok(())
    }
}

struct Fixture {
    shell: Shell,
    engine: Arc<RecordingEngine>,
    recorder: Arc<Recorder>,
    settings: SettingsService,
}

fn settings(skip_confirmation: bool) -> ShellSettings {
    ShellSettings {
        default_save_path: PathBuf::from("/downloads"),
        skip_add_torrent_dialog: skip_confirmation,
        ..ShellSettings::default()
    }
}

fn fixture(settings: ShellSettings) -> Fixture {
    let engine = Arc::new(RecordingEngine::default());
    let recorder = Arc::new(Recorder::default());
    let service = SettingsService::new(settings).expect("settings");
    let shell = Shell::new(
        engine.clone(),
        service.clone(),
        handles(&recorder),
        Metrics::new().expect("metrics"),
    );
    Fixture {
        shell,
        engine,
        recorder,
        settings: service,
    }
}

fn torrent_bytes(name: &str) -> Vec<u8> {
    format!(
        "d4:infod6:lengthi2048e4:name{}:{name}12:piece lengthi16384e6:pieces20:{}ee",
        name.len(),
        "x".repeat(20)
    )
    .into_bytes()
}

fn torrent(name: &str) -> AddJob {
    AddJob::metainfo(Metainfo::from_bytes(&torrent_bytes(name)).expect("metainfo"))
}

fn magnet(hex_byte: &str) -> AddJob {
    let uri = format!("magnet:?xt=urn:btih:{}", hex_byte.repeat(20));
    AddJob::magnet(MagnetLink::parse(&uri).expect("magnet"))
}

fn id(byte: u8) -> JobId {
    JobId::from_v1([byte; 20]).expect("identity")
}

fn snapshot(byte: u8, progress: f64) -> JobSnapshot {
    JobSnapshot {
        id: id(byte),
        name: format!("job-{byte}"),
        save_path: PathBuf::from("/downloads"),
        state: JobState::Downloading,
        rates: TransferRates::default(),
        progress,
        paused: false,
        total_wanted: 100,
        total_wanted_done: 0,
        label_id: None,
    }
}

fn added(byte: u8) -> SessionEvent {
    SessionEvent::Added {
        id: id(byte),
        handle: JobHandle(u64::from(byte)),
        snapshot: snapshot(byte, 0.0),
    }
}

fn batch(snapshots: Vec<JobSnapshot>) -> SessionEvent {
    SessionEvent::BatchStatistics { snapshots }
}

fn video_label() -> LabelDraft {
    LabelDraft {
        name: "Video".into(),
        color: "#3366ff".into(),
        save_path: Some(PathBuf::from("/videos")),
        save_path_enabled: true,
        apply_filter: Some("mkv".into()),
        apply_filter_enabled: true,
    }
}

#[tokio::test]
async fn labelled_batch_is_submitted_with_overrides() {
    let mut fx = fixture(settings(true));
    let video = fx.settings.create_label(video_label()).expect("label");

    fx.shell
        .admit(vec![torrent("ubuntu.iso"), torrent("movie.mkv")])
        .await;

    let movie = {
        let submitted = fx.engine.submitted.read().await;
        assert_eq!(submitted.len(), 2);
        assert_eq!(submitted[0].options.save_path, Some(PathBuf::from("/downloads")));
        assert_eq!(submitted[0].options.label_id, None);
        assert_eq!(submitted[1].options.save_path, Some(PathBuf::from("/videos")));
        assert_eq!(submitted[1].options.label_id, Some(video.id));
        submitted[1].id()
    };
    assert_eq!(fx.shell.list().tags().label_of(&movie), None);

    let mut added = snapshot(1, 0.0);
    added.id = movie;
    fx.shell
        .handle_event(SessionEvent::Added {
            id: movie,
            handle: JobHandle(7),
            snapshot: added,
        })
        .await;
    assert_eq!(fx.shell.list().tags().label_of(&movie), Some(video.id));
    assert_eq!(
        fx.shell.list().snapshot(&movie).and_then(|job| job.label_id),
        Some(video.id)
    );
}

#[tokio::test]
async fn selected_job_refreshes_only_after_selection() {
    let mut fx = fixture(settings(true));
    fx.shell.handle_event(added(1)).await;
    fx.shell.handle_event(batch(vec![snapshot(1, 0.5)])).await;
    fx.shell
        .handle_command(ShellCommand::SelectionChanged { rows: vec![0] })
        .await;
    fx.shell.handle_event(batch(vec![snapshot(1, 0.75)])).await;

    let details = fx.recorder.details();
    assert_eq!(details.len(), 2);
    let progress: Vec<f64> = details
        .iter()
        .map(|call| match call {
            DetailCall::Refresh(jobs) => {
                assert_eq!(jobs.len(), 1);
                assert_eq!(jobs[0].id, id(1));
                jobs[0].progress
            }
            DetailCall::Reset => panic!("unexpected reset"),
        })
        .collect();
    assert!((progress[1] - 0.75).abs() < f64::EPSILON);
}

#[tokio::test]
async fn removing_a_selected_job_resets_the_detail_view() {
    let mut fx = fixture(settings(true));
    fx.shell.handle_event(added(1)).await;
    fx.shell
        .handle_command(ShellCommand::SelectionChanged { rows: vec![0] })
        .await;
    fx.shell.handle_event(SessionEvent::Removed { id: id(1) }).await;

    assert!(!fx.shell.selection().contains(&id(1)));
    assert!(fx.shell.list().is_empty());
    assert_eq!(fx.recorder.details().last(), Some(&DetailCall::Reset));
    assert_eq!(*fx.recorder.job_counts.lock().expect("lock"), vec![1, 0]);
}

#[tokio::test]
async fn duplicate_adds_and_unknown_statistics_never_create_entries() {
    let mut fx = fixture(settings(true));
    fx.shell.handle_event(added(1)).await;
    fx.shell.handle_event(added(1)).await;
    fx.shell
        .handle_event(batch(vec![snapshot(1, 0.2), snapshot(2, 0.4)]))
        .await;
    fx.shell.handle_event(SessionEvent::Removed { id: id(3) }).await;

    assert_eq!(fx.shell.list().len(), 1);
    assert!(!fx.shell.list().contains(&id(2)));
    assert_eq!(
        fx.shell.list().snapshot(&id(1)).map(|job| job.progress),
        Some(0.2)
    );
    assert_eq!(*fx.recorder.job_counts.lock().expect("lock"), vec![1]);
}

#[tokio::test]
async fn selection_stays_within_the_active_set() {
    let mut fx = fixture(settings(true));
    let steps: Vec<Result<SessionEvent, Vec<usize>>> = vec![
        Ok(added(1)),
        Ok(added(2)),
        Err(vec![0, 1]),
        Ok(SessionEvent::Removed { id: id(1) }),
        Ok(added(3)),
        Err(vec![0, 1, 5]),
        Ok(SessionEvent::Removed { id: id(3) }),
        Err(vec![2]),
        Ok(SessionEvent::Removed { id: id(2) }),
    ];
    for step in steps {
        match step {
            Ok(event) => fx.shell.handle_event(event).await,
            Err(rows) => {
                fx.shell
                    .handle_command(ShellCommand::SelectionChanged { rows })
                    .await;
            }
        }
        for selected in fx.shell.selection().ids() {
            assert!(fx.shell.list().contains(selected));
        }
    }
    assert!(fx.shell.selection().is_empty());
}

#[tokio::test]
async fn disk_guard_pauses_once_per_low_space_episode() {
    let mut fx = fixture(ShellSettings {
        pause_on_low_disk_space: true,
        pause_on_low_disk_space_limit: 10,
        ..settings(true)
    });
    *fx.recorder.free_ratio.lock().expect("lock") = Some(0.05);
    fx.shell.handle_event(added(1)).await;
    fx.shell.handle_event(batch(vec![snapshot(1, 0.1)])).await;
    fx.shell.handle_event(batch(vec![snapshot(1, 0.2)])).await;

    assert_eq!(*fx.engine.paused.read().await, vec![id(1)]);
    assert_eq!(
        fx.recorder.notifications(),
        vec![(LOW_DISK_TITLE.to_string(), "job-1".to_string())]
    );

    *fx.recorder.free_ratio.lock().expect("lock") = Some(0.5);
    fx.shell.handle_event(batch(vec![snapshot(1, 0.3)])).await;
    *fx.recorder.free_ratio.lock().expect("lock") = Some(0.01);
    fx.shell.handle_event(batch(vec![snapshot(1, 0.4)])).await;
    assert_eq!(fx.engine.paused.read().await.len(), 2);
}

#[tokio::test]
async fn disk_guard_ignores_identities_outside_the_active_set() {
    let mut fx = fixture(ShellSettings {
        pause_on_low_disk_space: true,
        pause_on_low_disk_space_limit: 10,
        ..settings(true)
    });
    *fx.recorder.free_ratio.lock().expect("lock") = Some(0.01);
    fx.shell.handle_event(added(1)).await;
    fx.shell
        .handle_event(batch(vec![snapshot(1, 0.1), snapshot(2, 0.1)]))
        .await;

    assert_eq!(*fx.engine.paused.read().await, vec![id(1)]);
}

#[tokio::test]
async fn metadata_reaches_every_open_surface_and_cancel_never_submits() {
    let mut fx = fixture(settings(false));
    let first = magnet("aa");
    let second = magnet("bb");
    fx.shell.admit(vec![first.clone(), second.clone()]).await;

    assert_eq!(fx.shell.open_surfaces(), 2);
    assert_eq!(
        *fx.engine.searches.read().await,
        vec![vec![first.id(), second.id()]]
    );

    fx.shell
        .handle_event(SessionEvent::MetadataFound {
            id: first.id(),
            metadata: JobMetadata {
                name: "found".into(),
                total_size: 10,
                files: Vec::new(),
            },
        })
        .await;
    assert_eq!(*fx.recorder.metadata.lock().expect("lock"), vec![first.id(); 2]);

    let opened = fx.recorder.opened();
    fx.shell
        .handle_command(ShellCommand::ConfirmationCancelled {
            surface: opened[0].0,
        })
        .await;
    fx.shell
        .handle_command(ShellCommand::ConfirmationSubmitted {
            surface: opened[0].0,
            job: Box::new(opened[0].1.clone()),
        })
        .await;
    fx.shell
        .handle_command(ShellCommand::ConfirmationSubmitted {
            surface: opened[1].0,
            job: Box::new(opened[1].1.clone()),
        })
        .await;

    let submitted = fx.engine.submitted.read().await;
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].id(), second.id());
    assert_eq!(fx.shell.open_surfaces(), 0);
}

#[tokio::test]
async fn malformed_inputs_are_dropped_while_siblings_are_admitted() {
    let mut fx = fixture(settings(true));
    let dir = tempfile::tempdir().expect("tempdir");
    let good = dir.path().join("good.torrent");
    tokio::fs::write(&good, torrent_bytes("good.iso"))
        .await
        .expect("write");

    fx.shell
        .handle_command(ShellCommand::Admit(AdmissionRequest {
            files: vec![good, dir.path().join("absent.torrent")],
            magnets: vec!["magnet:?dn=missing-topic".into()],
            paste: Some(format!("\nmagnet:?xt=urn:btih:{}\n", "cc".repeat(20))),
        }))
        .await;

    let submitted = fx.engine.submitted.read().await;
    assert_eq!(submitted.len(), 2);
    assert_eq!(submitted[0].candidate_name(), Some("good.iso"));
    assert!(submitted[1].needs_metadata());
}

#[tokio::test]
async fn label_changes_rebuild_the_menu_and_clear_stale_filters() {
    let mut fx = fixture(settings(true));
    let video = fx.settings.create_label(video_label()).expect("label");
    let _ = fx
        .shell
        .handle(ShellMessage::SettingsChanged(Box::new(fx.settings.snapshot())))
        .await;

    fx.shell.handle_event(added(1)).await;
    fx.shell
        .handle_command(ShellCommand::AssignLabel {
            ids: vec![id(1)],
            label: Some(video.id),
        })
        .await;
    fx.shell
        .handle_command(ShellCommand::SetLabelFilter(video.id))
        .await;
    assert_eq!(fx.shell.list().visible_ids(), vec![id(1)]);

    fx.settings.delete_label(video.id).expect("delete");
    let _ = fx
        .shell
        .handle(ShellMessage::SettingsChanged(Box::new(fx.settings.snapshot())))
        .await;

    assert_eq!(fx.shell.list().label_filter(), None);
    assert_eq!(fx.shell.list().tags().label_of(&id(1)), None);
    let menus = fx.recorder.menus.lock().expect("lock").clone();
    assert_eq!(menus, vec![vec![], vec!["Video".to_string()], vec![]]);
}

#[tokio::test]
async fn status_surface_and_taskbar_follow_session_counters() {
    let mut fx = fixture(ShellSettings {
        enable_dht: false,
        ..settings(true)
    });
    fx.shell
        .handle_event(SessionEvent::SessionStatistics {
            stats: SessionStats { dht_nodes: 42 },
        })
        .await;
    let totals = TransferTotals {
        rates: TransferRates {
            download_bps: 10,
            upload_bps: 2,
        },
        total_wanted: 200,
        total_wanted_done: 50,
        downloading_any: true,
    };
    fx.shell
        .handle_event(SessionEvent::TransferTotals { totals })
        .await;
    fx.shell
        .handle_event(SessionEvent::TransferTotals {
            totals: TransferTotals {
                downloading_any: false,
                ..totals
            },
        })
        .await;

    assert_eq!(*fx.recorder.dht.lock().expect("lock"), vec![None]);
    assert_eq!(fx.recorder.rates.lock().expect("lock")[0].download_bps, 10);
    assert_eq!(*fx.recorder.progress.lock().expect("lock"), vec![Some(25), None]);
}

#[tokio::test]
async fn finished_jobs_notify_once_known() {
    let mut fx = fixture(settings(true));
    fx.shell.handle_event(SessionEvent::Finished { id: id(4) }).await;
    fx.shell.handle_event(added(4)).await;
    fx.shell.handle_event(SessionEvent::Finished { id: id(4) }).await;
    assert_eq!(
        fx.recorder.notifications(),
        vec![(FINISHED_TITLE.to_string(), "job-4".to_string())]
    );
}

#[tokio::test]
async fn remove_selected_forwards_data_removal() {
    let mut fx = fixture(settings(true));
    fx.shell.handle_event(added(1)).await;
    fx.shell.handle_event(added(2)).await;
    fx.shell.handle_command(ShellCommand::SelectAll).await;
    fx.shell
        .handle_command(ShellCommand::RemoveSelected { with_data: true })
        .await;

    let removed = fx.engine.removed.read().await;
    assert_eq!(removed.len(), 2);
    assert!(removed.iter().all(|(_, options)| options.with_data));
    assert_eq!(fx.shell.list().len(), 2);
}

#[tokio::test]
async fn pause_and_resume_apply_to_the_selection_only() {
    let mut fx = fixture(settings(true));
    for byte in 1..=3 {
        fx.shell.handle_event(added(byte)).await;
    }
    fx.shell
        .handle_command(ShellCommand::SelectionChanged { rows: vec![0, 2] })
        .await;
    fx.shell.handle_command(ShellCommand::PauseSelected).await;
    fx.shell.handle_command(ShellCommand::ResumeSelected).await;

    assert_eq!(*fx.engine.paused.read().await, vec![id(1), id(3)]);
    assert_eq!(*fx.engine.resumed.read().await, vec![id(1), id(3)]);
}

#[tokio::test]
async fn engine_loss_ends_the_loop_with_a_fatal_error() {
    let fx = fixture(settings(true));
    let (tx, rx) = inbox();
    let (publisher, stream) = seedling_events::channel();
    let forwarder = forward_engine_events(stream, tx.clone());
    drop(publisher);

    let result = timeout(Duration::from_secs(2), fx.shell.run(rx))
        .await
        .expect("shell loop finished");
    assert!(matches!(result, Err(AppError::EngineChannelLost)));
    assert_eq!(
        *fx.recorder.fatal.lock().expect("lock"),
        vec![ENGINE_LOST_MESSAGE.to_string()]
    );
    forwarder.await.expect("forwarder joined");
    drop(tx);
}

#[tokio::test]
async fn loopback_engine_round_trip_until_shutdown() {
    let recorder = Arc::new(Recorder::default());
    let service = SettingsService::new(settings(false)).expect("settings");
    let (tx, rx) = inbox();
    let (publisher, stream) = seedling_events::channel();
    let (engine, _worker) = EngineHandle::spawn(publisher);
    let _forwarder = forward_engine_events(stream, tx.clone());
    let shell = Shell::new(
        Arc::new(engine),
        service,
        handles(&recorder),
        Metrics::new().expect("metrics"),
    );
    let running = tokio::spawn(shell.run(rx));

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("small.torrent");
    tokio::fs::write(&path, torrent_bytes("small.iso"))
        .await
        .expect("write");
    tx.send(ShellMessage::Command(ShellCommand::Admit(AdmissionRequest {
        files: vec![path],
        ..AdmissionRequest::default()
    })))
    .expect("send");

    let surface = timeout(Duration::from_secs(2), async {
        loop {
            if let Some(opened) = recorder.opened().first().cloned() {
                return opened;
            }
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("surface opened");
    tx.send(ShellMessage::Command(ShellCommand::ConfirmationSubmitted {
        surface: surface.0,
        job: Box::new(surface.1),
    }))
    .expect("send");

    timeout(Duration::from_secs(5), async {
        loop {
            if recorder
                .notifications()
                .iter()
                .any(|(title, body)| title == FINISHED_TITLE && body == "small.iso")
            {
                return;
            }
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("job finished");

    tx.send(ShellMessage::Shutdown).expect("send");
    let result = timeout(Duration::from_secs(2), running)
        .await
        .expect("shell stopped")
        .expect("join");
    assert!(result.is_ok());
    assert_eq!(recorder.job_counts.lock().expect("lock").first(), Some(&1));
    assert_eq!(*recorder.closed.lock().expect("lock"), 1);
}

#[tokio::test]
async fn assigning_unknown_labels_is_rejected() {
    let mut fx = fixture(settings(true));
    fx.shell.handle_event(added(1)).await;
    fx.shell
        .handle_command(ShellCommand::AssignLabel {
            ids: vec![id(1)],
            label: LabelId::new(77),
        })
        .await;
    assert_eq!(fx.shell.list().tags().label_of(&id(1)), None);
}
