//! 异步循环加载
//!
//! 每个乐器在独立的工作线程上解码，结果通过通道送回界面线程。

use crate::audio::{decode_file, DecodedLoop};
use crate::error::LoadError;
use crate::structure::InstrumentId;
use crossbeam_channel::{unbounded, Receiver, TryRecvError};
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::thread;

/// 单个乐器的加载结果
#[derive(Debug)]
pub struct LoadOutcome {
    pub id: InstrumentId,
    pub result: Result<DecodedLoop, LoadError>,
}

pub(crate) type DecodeFn = fn(&Path) -> Result<DecodedLoop, LoadError>;

pub struct LoopLoader {
    receiver: Receiver<LoadOutcome>,
    outstanding: BTreeMap<InstrumentId, PathBuf>, // 尚未收到结果的任务
}

impl LoopLoader {
    /// 为每个任务启动一个解码线程
    pub fn spawn(jobs: Vec<(InstrumentId, PathBuf)>) -> Self {
        Self::spawn_with(jobs, decode_file)
    }

    pub(crate) fn spawn_with(jobs: Vec<(InstrumentId, PathBuf)>, decode: DecodeFn) -> Self {
        let (sender, receiver) = unbounded();
        let outstanding = jobs.iter().cloned().collect();

        for (id, path) in jobs {
            let worker_sender = sender.clone();
            let worker_path = path.clone();
            let spawned = thread::Builder::new()
                .name(format!("loop-loader-{}", id.0))
                .spawn(move || {
                    // 解码器内部 panic 也要变成该乐器的加载失败
                    let result = panic::catch_unwind(AssertUnwindSafe(|| decode(&worker_path)))
                        .unwrap_or_else(|_| {
                            log::error!("Decoder panicked on {:?}", worker_path);
                            Err(LoadError::Worker(worker_path.clone()))
                        });
                    let _ = worker_sender.send(LoadOutcome { id, result });
                });

            if let Err(e) = spawned {
                log::error!("Failed to spawn loader thread for {:?}: {}", path, e);
                let _ = sender.send(LoadOutcome {
                    id,
                    result: Err(LoadError::Worker(path)),
                });
            }
        }

        Self {
            receiver,
            outstanding,
        }
    }

    /// 取出所有已完成的结果，不阻塞
    pub fn poll(&mut self) -> Vec<LoadOutcome> {
        let mut outcomes = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(outcome) => {
                    self.outstanding.remove(&outcome.id);
                    outcomes.push(outcome);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    outcomes.extend(self.abandon_outstanding());
                    break;
                }
            }
        }
        outcomes
    }

    /// 阻塞直到所有任务完成
    pub fn wait_all(mut self) -> Vec<LoadOutcome> {
        let mut outcomes = Vec::with_capacity(self.outstanding.len());
        while !self.outstanding.is_empty() {
            match self.receiver.recv() {
                Ok(outcome) => {
                    self.outstanding.remove(&outcome.id);
                    outcomes.push(outcome);
                }
                Err(_) => outcomes.extend(self.abandon_outstanding()),
            }
        }
        outcomes
    }

    /// 所有工作线程都已退出，剩下的任务不会再有结果
    fn abandon_outstanding(&mut self) -> Vec<LoadOutcome> {
        std::mem::take(&mut self.outstanding)
            .into_iter()
            .map(|(id, path)| {
                log::error!("Loader worker for {:?} exited without a result", path);
                LoadOutcome {
                    id,
                    result: Err(LoadError::Worker(path)),
                }
            })
            .collect()
    }

    pub fn remaining(&self) -> usize {
        self.outstanding.len()
    }

    pub fn is_finished(&self) -> bool {
        self.outstanding.is_empty()
    }
}
