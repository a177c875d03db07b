//! 예약 리포트 실행기.
//!
//! 활성 작업마다 tokio 타이머 하나를 `nextRun - now` 뒤로 걸어 두고,
//! 타이머가 울리면 별도 태스크에서 실행한 뒤 다음 실행을 다시 건다.
//! 타이머 취소는 이미 시작된 실행을 중단하지 않는다.
//!
//! 메모리 목록이 기준이며, 저장소 실패는 경고 로그만 남긴다.

use beacon_core::config::ReportSchedulerConfig;
use beacon_core::error::CoreError;
use beacon_core::models::report::{
    NewScheduledReport, RunStatus, ScheduledReport, ScheduledReportPatch, ScheduledReportRun,
};
use beacon_core::ports::renderer::ReportRenderer;
use beacon_core::ports::storage::ReportStore;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::collector::ReportDataCollector;
use crate::schedule::next_run_in;

/// 예약 리포트 실행기
pub struct ReportScheduler {
    config: ReportSchedulerConfig,
    /// 생성 순서
    jobs: Mutex<Vec<ScheduledReport>>,
    /// 시작 순서
    runs: Mutex<Vec<ScheduledReportRun>>,
    /// 작업 ID → 대기 중인 타이머
    timers: Mutex<HashMap<String, JoinHandle<()>>>,
    collector: ReportDataCollector,
    renderer: Arc<dyn ReportRenderer>,
    store: Option<Arc<dyn ReportStore>>,
    self_ref: Weak<ReportScheduler>,
}

impl ReportScheduler {
    /// 새 실행기 생성. 타이머 태스크가 자신을 참조하므로 `Arc`로 반환
    pub fn new(
        config: ReportSchedulerConfig,
        collector: ReportDataCollector,
        renderer: Arc<dyn ReportRenderer>,
        store: Option<Arc<dyn ReportStore>>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            config,
            jobs: Mutex::new(Vec::new()),
            runs: Mutex::new(Vec::new()),
            timers: Mutex::new(HashMap::new()),
            collector,
            renderer,
            store,
            self_ref: self_ref.clone(),
        })
    }

    fn next_run(&self, report: &ScheduledReport, now: DateTime<Utc>) -> Result<DateTime<Utc>, CoreError> {
        next_run_in(&report.schedule, now, self.config.timezone)
    }

    // ── CRUD ──

    /// 작업 추가. 스케줄 검증 후 다음 실행 계산, 활성이면 타이머 등록
    pub async fn add(&self, new: NewScheduledReport) -> Result<ScheduledReport, CoreError> {
        if new.name.trim().is_empty() {
            return Err(CoreError::validation("name", "이름이 비어 있습니다"));
        }
        new.schedule.validate()?;

        let now = Utc::now();
        let mut report = ScheduledReport {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            description: new.description,
            config: new.config,
            schedule: new.schedule,
            recipients: new.recipients,
            enabled: new.enabled,
            last_run: None,
            next_run: None,
            created_at: now,
            created_by: new.created_by,
        };
        report.next_run = Some(self.next_run(&report, now)?);

        self.jobs.lock().push(report.clone());
        self.persist_report(&report).await;
        if report.enabled {
            self.arm(&report);
        }

        info!("예약 리포트 추가: {} ({})", report.name, report.id);
        Ok(report)
    }

    /// 작업 부분 수정. 기존 타이머를 취소하고 활성이면 다시 등록
    pub async fn update(
        &self,
        id: &str,
        patch: ScheduledReportPatch,
    ) -> Result<ScheduledReport, CoreError> {
        if let Some(schedule) = &patch.schedule {
            schedule.validate()?;
        }
        if patch.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(CoreError::validation("name", "이름이 비어 있습니다"));
        }

        let now = Utc::now();
        let updated = {
            let mut jobs = self.jobs.lock();
            let job = jobs
                .iter_mut()
                .find(|j| j.id == id)
                .ok_or_else(|| CoreError::not_found("ScheduledReport", id))?;

            let mut next = job.clone();
            if let Some(name) = patch.name {
                next.name = name;
            }
            if let Some(description) = patch.description {
                next.description = description;
            }
            if let Some(config) = patch.config {
                next.config = config;
            }
            if let Some(schedule) = patch.schedule {
                next.schedule = schedule;
            }
            if let Some(recipients) = patch.recipients {
                next.recipients = recipients;
            }
            if let Some(enabled) = patch.enabled {
                next.enabled = enabled;
            }
            next.next_run = Some(self.next_run(&next, now)?);
            *job = next.clone();
            next
        };

        self.cancel(id);
        if updated.enabled {
            self.arm(&updated);
        }
        self.persist_report(&updated).await;

        info!("예약 리포트 수정: {} (활성={})", updated.name, updated.enabled);
        Ok(updated)
    }

    /// 작업 삭제. 실행 이력은 유지
    pub async fn delete(&self, id: &str) -> Result<(), CoreError> {
        let removed = {
            let mut jobs = self.jobs.lock();
            let index = jobs
                .iter()
                .position(|j| j.id == id)
                .ok_or_else(|| CoreError::not_found("ScheduledReport", id))?;
            jobs.remove(index)
        };
        self.cancel(id);

        if let Some(store) = &self.store {
            if let Err(e) = store.delete_report(id).await {
                warn!("예약 리포트 삭제 저장 실패: {e}");
            }
        }

        info!("예약 리포트 삭제: {} ({id})", removed.name);
        Ok(())
    }

    pub fn get_all(&self) -> Vec<ScheduledReport> {
        self.jobs.lock().clone()
    }

    pub fn get(&self, id: &str) -> Option<ScheduledReport> {
        self.jobs.lock().iter().find(|j| j.id == id).cloned()
    }

    /// 실행 이력 (최신순). `report_id`가 있으면 해당 작업만
    pub fn get_runs(&self, report_id: Option<&str>) -> Vec<ScheduledReportRun> {
        self.runs
            .lock()
            .iter()
            .rev()
            .filter(|r| report_id.map_or(true, |id| r.report_id == id))
            .cloned()
            .collect()
    }

    /// 즉시 실행. 실행 기록 반환
    pub async fn run_now(&self, id: &str) -> Result<ScheduledReportRun, CoreError> {
        let job = self
            .get(id)
            .ok_or_else(|| CoreError::not_found("ScheduledReport", id))?;
        Ok(self.execute_and_reschedule(job, None).await)
    }

    // ── 실행 ──

    /// 실행 후 lastRun/nextRun 갱신 및 타이머 재등록
    ///
    /// `fired`는 타이머가 처리한 회차. 타이머는 단조 시계로 잠들기 때문에 벽시계보다
    /// 먼저 깰 수 있고, 다음 실행은 항상 이 회차 이후로 계산한다.
    async fn execute_and_reschedule(
        &self,
        job: ScheduledReport,
        fired: Option<DateTime<Utc>>,
    ) -> ScheduledReportRun {
        let run = self.execute(&job).await;

        let now = fired.map_or_else(Utc::now, |occurrence| occurrence.max(Utc::now()));
        let updated = {
            let mut jobs = self.jobs.lock();
            // 실행 중 삭제된 작업은 재등록하지 않음
            let Some(current) = jobs.iter_mut().find(|j| j.id == job.id) else {
                return run;
            };
            current.last_run = Some(run.start_time);
            match next_run_in(&current.schedule, now, self.config.timezone) {
                Ok(next) => current.next_run = Some(next),
                Err(e) => warn!("다음 실행 계산 실패: {}: {e}", current.id),
            }
            current.clone()
        };

        self.persist_report(&updated).await;
        if updated.enabled {
            self.arm(&updated);
        }
        run
    }

    /// 데이터 수집 → 렌더링 → 실행 기록. 실패는 `failed` 기록으로 남는다
    async fn execute(&self, job: &ScheduledReport) -> ScheduledReportRun {
        let start = Utc::now();
        let mut run = ScheduledReportRun {
            id: Uuid::new_v4().to_string(),
            report_id: job.id.clone(),
            start_time: start,
            end_time: None,
            status: RunStatus::Running,
            error: None,
            file_path: None,
            file_size: None,
        };
        self.runs.lock().push(run.clone());
        self.persist_run(&run).await;
        info!("리포트 실행 시작: {} ({})", job.name, run.id);

        let data = self.collector.collect(job, start);
        match self.renderer.render(&job.config, &data).await {
            Ok(rendered) => {
                let file_size = rendered.file_size.or_else(|| {
                    serde_json::to_vec(&data).ok().map(|bytes| bytes.len() as u64)
                });
                run.status = RunStatus::Completed;
                run.file_path = Some(rendered.file_path);
                run.file_size = file_size;
                info!("리포트 실행 완료: {} ({:?}bytes)", job.name, file_size);
            }
            Err(e) => {
                run.status = RunStatus::Failed;
                run.error = Some(e.to_string());
                warn!("리포트 실행 실패: {}: {e}", job.name);
            }
        }
        run.end_time = Some(Utc::now());

        {
            let mut runs = self.runs.lock();
            if let Some(entry) = runs.iter_mut().find(|r| r.id == run.id) {
                *entry = run.clone();
            }
        }
        self.persist_run(&run).await;
        run
    }

    // ── 타이머 ──

    /// `nextRun`에 맞춰 타이머 등록 (기존 타이머는 교체)
    fn arm(&self, job: &ScheduledReport) {
        let Some(next_run) = job.next_run else {
            return;
        };
        let delay = (next_run - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        let id = job.id.clone();
        let weak = self.self_ref.clone();

        let timer_id = id.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(scheduler) = weak.upgrade() else {
                return;
            };
            // 실행은 별도 태스크. 이후 타이머 취소가 실행을 끊지 않는다
            tokio::spawn(async move {
                scheduler.fire(&timer_id).await;
            });
        });

        if let Some(previous) = self.timers.lock().insert(id, handle) {
            previous.abort();
        }
        debug!("리포트 타이머 등록: {} ({}s 후)", job.id, delay.as_secs());
    }

    fn cancel(&self, id: &str) {
        if let Some(handle) = self.timers.lock().remove(id) {
            handle.abort();
            debug!("리포트 타이머 취소: {id}");
        }
    }

    async fn fire(&self, id: &str) {
        let Some(job) = self.get(id).filter(|j| j.enabled) else {
            return;
        };
        let occurrence = job.next_run;
        self.execute_and_reschedule(job, occurrence).await;
    }

    /// 아직 울리지 않은 타이머 수
    pub fn pending_timers(&self) -> usize {
        self.timers
            .lock()
            .values()
            .filter(|h| !h.is_finished())
            .count()
    }

    /// 모든 타이머 취소 (진행 중 실행은 유지)
    pub fn shutdown(&self) {
        let mut timers = self.timers.lock();
        for (_, handle) in timers.drain() {
            handle.abort();
        }
        info!("예약 리포트 타이머 전체 취소");
    }

    // ── 기동/보존 ──

    /// 저장소에서 작업과 최근 이력을 읽고, 다음 실행을 재계산해 타이머 등록
    pub async fn load(&self) -> Result<usize, CoreError> {
        let Some(store) = &self.store else {
            return Ok(0);
        };
        let now = Utc::now();
        let mut reports = store.load_reports().await?;
        let runs = store.load_runs(now - self.config.run_retention()).await?;

        for report in &mut reports {
            match self.next_run(report, now) {
                Ok(next) => report.next_run = Some(next),
                Err(e) => {
                    warn!("저장된 스케줄 무효, 비활성화: {}: {e}", report.id);
                    report.enabled = false;
                    report.next_run = None;
                }
            }
        }

        for report in &reports {
            self.cancel(&report.id);
        }
        *self.jobs.lock() = reports.clone();
        *self.runs.lock() = runs;

        for report in &reports {
            self.persist_report(report).await;
            if report.enabled {
                self.arm(report);
            }
        }

        info!("예약 리포트 로드: {}건", reports.len());
        Ok(reports.len())
    }

    /// 보존 기간이 지난 실행 이력 삭제. 메모리에서 삭제한 건수 반환
    pub async fn prune_runs(&self) -> usize {
        self.prune_runs_at(Utc::now()).await
    }

    pub async fn prune_runs_at(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.config.run_retention();
        let removed = {
            let mut runs = self.runs.lock();
            let before = runs.len();
            runs.retain(|r| r.start_time >= cutoff);
            before - runs.len()
        };

        if let Some(store) = &self.store {
            if let Err(e) = store.prune_runs(cutoff).await {
                warn!("실행 이력 정리 저장 실패: {e}");
            }
        }
        if removed > 0 {
            debug!("실행 이력 정리: {removed}건");
        }
        removed
    }

    /// 종료 신호까지 주기적으로 이력 정리. 종료 시 타이머도 취소
    pub async fn run_maintenance_loop(self: Arc<Self>, mut shutdown_rx: watch::Receiver<bool>) {
        info!(
            "리포트 유지보수 루프 시작: {}s 주기, 보존 {}일",
            self.config.prune_interval_secs, self.config.run_retention_days
        );
        let mut interval = tokio::time::interval(self.config.prune_interval());

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.prune_runs().await;
                }
                _ = shutdown_rx.changed() => {
                    self.shutdown();
                    info!("리포트 유지보수 루프 종료");
                    break;
                }
            }
        }
    }

    // ── 저장 ──

    async fn persist_report(&self, report: &ScheduledReport) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save_report(report).await {
                warn!("예약 리포트 저장 실패: {}: {e}", report.id);
            }
        }
    }

    async fn persist_run(&self, run: &ScheduledReportRun) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save_run(run).await {
                warn!("실행 기록 저장 실패: {}: {e}", run.id);
            }
        }
    }
}
