use crate::core::naming::NamingPolicy;
use crate::core::projector::{DEFAULT_FILE_PREFIX, FILE_PREFIX_KEY};
use crate::core::renderer::render;
use crate::document::Template;
use crate::domain::model::{BatchReport, BatchState, ProgressEvent, RecordOutcome, SubstitutionRecord};
use crate::domain::ports::Storage;
use crate::utils::error::{MergeError, Result};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// 單筆失敗時的處理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// 第一個錯誤即停止整個批次
    #[default]
    FailFast,
    /// 記錄錯誤後繼續處理後續記錄
    Continue,
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub template_path: PathBuf,
    pub output_dir: PathBuf,
    pub naming: NamingPolicy,
    pub failure_policy: FailurePolicy,
    /// 文件名中的日期；未指定時取批次開始當天
    pub date: Option<NaiveDate>,
}

impl BatchOptions {
    pub fn new(template_path: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            template_path: template_path.into(),
            output_dir: output_dir.into(),
            naming: NamingPolicy::default(),
            failure_policy: FailurePolicy::default(),
            date: None,
        }
    }
}

/// 依序為每筆記錄渲染並保存文件，同時送出進度事件
pub struct BatchOrchestrator<S: Storage> {
    storage: S,
    options: BatchOptions,
}

impl<S: Storage> BatchOrchestrator<S> {
    pub fn new(storage: S, options: BatchOptions) -> Self {
        Self { storage, options }
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    pub fn output_path(&self, date: NaiveDate, record: &SubstitutionRecord, index: usize) -> PathBuf {
        let prefix = record
            .get(FILE_PREFIX_KEY)
            .map(String::as_str)
            .unwrap_or(DEFAULT_FILE_PREFIX);
        self.options
            .output_dir
            .join(self.options.naming.file_name(date, prefix, index))
    }

    async fn generate_one(&self, record: &SubstitutionRecord, index: usize, date: NaiveDate) -> Result<PathBuf> {
        // 每份文件都重新載入模板，避免文件之間互相污染
        let bytes = self
            .storage
            .read_file(&self.options.template_path)
            .await
            .map_err(|e| {
                MergeError::document_format(format!(
                    "cannot load template {}: {}",
                    self.options.template_path.display(),
                    e
                ))
            })?;
        let template = Template::from_bytes(&bytes)?;

        let document = render(&template, record);
        let data = document.to_bytes()?;

        let path = self.output_path(date, record, index);
        self.storage.write_file(&path, &data).await?;
        tracing::debug!("💾 Saved {} ({} bytes)", path.display(), data.len());

        Ok(path)
    }

    pub async fn run(
        &self,
        records: &[SubstitutionRecord],
        events: &UnboundedSender<ProgressEvent>,
        cancel: &AtomicBool,
    ) -> BatchReport {
        let total = records.len();
        let date = self.options.date.unwrap_or_else(|| Local::now().date_naive());
        let mut report = BatchReport::new(total);
        report.state = BatchState::Running;

        tracing::info!(
            "🚀 Generating {} documents into {}",
            total,
            self.options.output_dir.display()
        );

        for (position, record) in records.iter().enumerate() {
            if cancel.load(Ordering::SeqCst) {
                let completed = report.succeeded();
                tracing::warn!("⏹️ Batch cancelled after {} documents", completed);
                report.state = BatchState::Cancelled;
                emit(
                    events,
                    ProgressEvent::Cancelled {
                        completed,
                        message: format!("已取消，已生成 {} 份文档", completed),
                    },
                );
                return report;
            }

            let index = position + 1;
            match self.generate_one(record, index, date).await {
                Ok(path) => {
                    report.outcomes.push(RecordOutcome::Generated {
                        index,
                        path: path.clone(),
                    });
                    let completed = report.succeeded();
                    emit(
                        events,
                        ProgressEvent::Progress {
                            percent: index as f64 / total as f64 * 100.0,
                            completed,
                            total,
                            message: format!("已生成 {}/{} 份文档", completed, total),
                            output: path,
                        },
                    );
                }
                Err(e) => {
                    tracing::error!("❌ Document {}/{} failed: {}", index, total, e);
                    report.outcomes.push(RecordOutcome::Failed {
                        index,
                        error: e.to_string(),
                    });

                    match self.options.failure_policy {
                        FailurePolicy::FailFast => {
                            let completed = report.succeeded();
                            report.state = BatchState::Failed;
                            emit(
                                events,
                                ProgressEvent::Failed {
                                    completed,
                                    message: format!(
                                        "生成文档时出错: {}（已成功生成 {} 份）",
                                        e, completed
                                    ),
                                },
                            );
                            return report;
                        }
                        FailurePolicy::Continue => emit(
                            events,
                            ProgressEvent::RecordFailed {
                                index,
                                message: format!("第 {} 份文档生成失败: {}", index, e),
                            },
                        ),
                    }
                }
            }
        }

        let succeeded = report.succeeded();
        let failed = report.failed();
        report.state = BatchState::Completed;

        let message = if failed == 0 {
            format!("完成！成功生成 {} 份文档", succeeded)
        } else {
            format!("完成！成功生成 {} 份文档，失败 {} 份", succeeded, failed)
        };
        tracing::info!("✅ Batch finished: {} succeeded, {} failed", succeeded, failed);
        emit(
            events,
            ProgressEvent::Completed {
                succeeded,
                failed,
                message,
            },
        );

        report
    }
}

impl<S: Storage + 'static> BatchOrchestrator<S> {
    /// 在背景任務中執行批次；事件按產生順序從 [`BatchHandle`] 取出
    pub fn spawn(self, records: Vec<SubstitutionRecord>) -> BatchHandle {
        let (sender, receiver) = mpsc::unbounded_channel();
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);

        let task = tokio::spawn(async move { self.run(&records, &sender, &flag).await });

        BatchHandle {
            events: receiver,
            task,
            cancel,
        }
    }
}

fn emit(events: &UnboundedSender<ProgressEvent>, event: ProgressEvent) {
    if events.send(event).is_err() {
        tracing::debug!("Progress receiver dropped; event discarded");
    }
}

#[derive(Debug, Clone)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct BatchHandle {
    events: UnboundedReceiver<ProgressEvent>,
    task: JoinHandle<BatchReport>,
    cancel: Arc<AtomicBool>,
}

impl BatchHandle {
    /// 等待下一個事件；批次結束且事件取完後回傳 `None`
    pub async fn next_event(&mut self) -> Option<ProgressEvent> {
        self.events.recv().await
    }

    /// 供非 async 呼叫端使用，不可在 runtime 執行緒內呼叫
    pub fn blocking_next_event(&mut self) -> Option<ProgressEvent> {
        self.events.blocking_recv()
    }

    /// 請求取消；在兩份文件之間生效，不會留下寫到一半的文件
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// 可移交給其他任務（例如 Ctrl-C 處理）的取消句柄
    pub fn cancel_token(&self) -> CancelToken {
        CancelToken(Arc::clone(&self.cancel))
    }

    pub async fn wait(self) -> Result<BatchReport> {
        self.task.await.map_err(|e| MergeError::Processing {
            message: format!("batch worker stopped unexpectedly: {}", e),
        })
    }
}
