use std::sync::Mutex;
use std::time::{Duration, Instant};
use sysinfo::{Pid, RefreshKind, System};

#[derive(Debug, Clone)]
pub struct ResourceSample {
    pub cpu_usage: f32,
    pub memory_mb: u64,
    pub peak_memory_mb: u64,
    pub elapsed: Duration,
}

/// 批次生成期間的資源使用記錄，僅在 `--monitor` 時啟用
pub struct ResourceMonitor {
    state: Option<Mutex<MonitorState>>,
    started: Instant,
}

struct MonitorState {
    system: System,
    pid: Pid,
    peak_memory_mb: u64,
}

impl ResourceMonitor {
    pub fn new(enabled: bool) -> Self {
        let state = if enabled {
            match sysinfo::get_current_pid() {
                Ok(pid) => {
                    let mut system = System::new_with_specifics(RefreshKind::everything());
                    system.refresh_all();
                    Some(Mutex::new(MonitorState {
                        system,
                        pid,
                        peak_memory_mb: 0,
                    }))
                }
                Err(e) => {
                    tracing::warn!("Resource monitoring disabled: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Self {
            state,
            started: Instant::now(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.state.is_some()
    }

    pub fn sample(&self) -> Option<ResourceSample> {
        let mut state = self.state.as_ref()?.lock().ok()?;
        state.system.refresh_all();

        let pid = state.pid;
        let (cpu_usage, memory_mb) = {
            let process = state.system.process(pid)?;
            (process.cpu_usage(), process.memory() / 1024 / 1024)
        };
        state.peak_memory_mb = state.peak_memory_mb.max(memory_mb);

        Some(ResourceSample {
            cpu_usage,
            memory_mb,
            peak_memory_mb: state.peak_memory_mb,
            elapsed: self.started.elapsed(),
        })
    }

    pub fn log_phase(&self, phase: &str) {
        if let Some(sample) = self.sample() {
            tracing::info!(
                "📊 {} - CPU: {:.1}%, Memory: {}MB, Peak: {}MB, Time: {:?}",
                phase,
                sample.cpu_usage,
                sample.memory_mb,
                sample.peak_memory_mb,
                sample.elapsed
            );
        }
    }

    pub fn log_summary(&self, documents: usize) {
        if let Some(sample) = self.sample() {
            let seconds = sample.elapsed.as_secs_f64();
            let throughput = if seconds > 0.0 {
                documents as f64 / seconds
            } else {
                0.0
            };
            tracing::info!(
                "📊 Final Stats - {} documents in {:?} ({:.1} docs/s), Peak Memory: {}MB",
                documents,
                sample.elapsed,
                throughput,
                sample.peak_memory_mb
            );
        }
    }
}

impl Default for ResourceMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}
