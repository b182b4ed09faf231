#[cfg(feature = "cli")]
use std::sync::Mutex;
#[cfg(feature = "cli")]
use std::time::{Duration, Instant};
#[cfg(feature = "cli")]
use sysinfo::{Pid, RefreshKind, System};

#[cfg(feature = "cli")]
#[derive(Debug, Clone)]
pub struct ProcessStats {
    pub cpu_usage: f32,
    pub memory_usage_mb: u64,
    pub peak_memory_mb: u64,
    pub elapsed_time: Duration,
}

/// 在 Run Coordinator 狀態轉換時記錄行程資源使用量
#[cfg(feature = "cli")]
pub struct SystemMonitor {
    inner: Option<MonitorState>,
    start_time: Instant,
}

#[cfg(feature = "cli")]
struct MonitorState {
    system: Mutex<System>,
    pid: Pid,
    peak_memory_mb: Mutex<u64>,
}

#[cfg(feature = "cli")]
impl SystemMonitor {
    pub fn new(enabled: bool) -> Self {
        let inner = if enabled {
            match sysinfo::get_current_pid() {
                Ok(pid) => {
                    let mut system = System::new_with_specifics(RefreshKind::everything());
                    system.refresh_all();
                    Some(MonitorState {
                        system: Mutex::new(system),
                        pid,
                        peak_memory_mb: Mutex::new(0),
                    })
                }
                Err(e) => {
                    tracing::warn!("System monitoring disabled: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Self {
            inner,
            start_time: Instant::now(),
        }
    }

    pub fn stats(&self) -> Option<ProcessStats> {
        let state = self.inner.as_ref()?;
        let mut system = state.system.lock().ok()?;
        system.refresh_all();

        let process = system.process(state.pid)?;
        let memory_mb = process.memory() / 1024 / 1024;

        let mut peak = state.peak_memory_mb.lock().ok()?;
        *peak = (*peak).max(memory_mb);

        Some(ProcessStats {
            cpu_usage: process.cpu_usage(),
            memory_usage_mb: memory_mb,
            peak_memory_mb: *peak,
            elapsed_time: self.start_time.elapsed(),
        })
    }

    pub fn log_phase(&self, phase: &str) {
        if let Some(stats) = self.stats() {
            tracing::info!(
                "📊 {} - CPU: {:.1}%, Memory: {}MB, Peak: {}MB, Time: {:?}",
                phase,
                stats.cpu_usage,
                stats.memory_usage_mb,
                stats.peak_memory_mb,
                stats.elapsed_time
            );
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }
}

#[cfg(feature = "cli")]
impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

// 非 CLI 建置沒有 sysinfo
#[cfg(not(feature = "cli"))]
#[derive(Default)]
pub struct SystemMonitor;

#[cfg(not(feature = "cli"))]
impl SystemMonitor {
    pub fn new(_enabled: bool) -> Self {
        Self
    }

    pub fn log_phase(&self, _phase: &str) {}

    pub fn is_enabled(&self) -> bool {
        false
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_monitor_reports_nothing() {
        let monitor = SystemMonitor::default();
        assert!(!monitor.is_enabled());
        assert!(monitor.stats().is_none());
    }

    #[test]
    fn test_enabled_monitor_tracks_peak_memory() {
        let monitor = SystemMonitor::new(true);
        if let Some(stats) = monitor.stats() {
            assert!(stats.peak_memory_mb >= stats.memory_usage_mb);
        }
    }
}
