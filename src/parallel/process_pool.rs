use std::borrow::Cow;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{Duration, Instant};

use crossbeam::channel::{Receiver, Sender, unbounded};
use tracing::{debug, error, info, warn};

use crate::error::{FanoutError, FanoutResult, PartitionFailure};
use crate::types::{Partition, PartitionOutcome};
use crate::worker::{WorkerReply, WorkerRequest};

use super::aggregate::CompletionMap;
use super::progress::PartitionProgress;

/// How long a worker gets to exit after its stdin closes before it is killed
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);
const SHUTDOWN_POLL: Duration = Duration::from_millis(20);

/// One live worker process speaking the JSON line protocol
struct WorkerProcess {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
}

impl WorkerProcess {
    fn spawn(command: &[String]) -> std::io::Result<Self> {
        let (program, args) = command.split_first().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty worker command")
        })?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(std::io::Error::other("worker pipes unavailable"));
        };

        debug!("Spawned worker process {}", child.id());
        Ok(Self {
            child,
            stdin: Some(stdin),
            stdout: BufReader::new(stdout),
        })
    }

    fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Send one partition and block until its reply arrives
    fn call(&mut self, partition: &Partition) -> PartitionOutcome {
        let request = WorkerRequest {
            index: partition.index,
            items: Cow::Borrowed(partition.items.as_slice()),
            flags: partition.flags,
        };
        let mut line = serde_json::to_string(&request)
            .map_err(|e| PartitionFailure::Protocol(format!("could not encode request: {e}")))?;
        line.push('\n');

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(PartitionFailure::WorkerExited);
        };
        if stdin
            .write_all(line.as_bytes())
            .and_then(|_| stdin.flush())
            .is_err()
        {
            return Err(PartitionFailure::WorkerExited);
        }

        let mut reply = String::new();
        match self.stdout.read_line(&mut reply) {
            Ok(0) => Err(PartitionFailure::WorkerExited),
            Ok(_) => serde_json::from_str::<WorkerReply>(reply.trim_end())
                .map_err(|e| PartitionFailure::Protocol(format!("malformed reply: {e}")))?
                .into_outcome(partition.index),
            Err(e) => Err(PartitionFailure::Protocol(format!("could not read reply: {e}"))),
        }
    }
}

impl Drop for WorkerProcess {
    fn drop(&mut self) {
        // Closing stdin is the worker's signal to exit
        drop(self.stdin.take());

        let deadline = Instant::now() + SHUTDOWN_GRACE;
        loop {
            match self.child.try_wait() {
                Ok(Some(status)) => {
                    debug!("Worker process {} exited with {}", self.child.id(), status);
                    return;
                }
                Ok(None) if Instant::now() < deadline => std::thread::sleep(SHUTDOWN_POLL),
                Ok(None) => break,
                Err(e) => {
                    warn!("Could not poll worker process {}: {}", self.child.id(), e);
                    break;
                }
            }
        }

        warn!("Killing worker process {} after shutdown grace period", self.child.id());
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Bounded pool of worker processes scoped to one run
///
/// Workers are memory-isolated, so nothing here is shared and mutated: each
/// slot thread owns its process and completions flow back over a channel.
pub struct ProcessPoolExecutor {
    command: Vec<String>,
    workers: Vec<WorkerProcess>,
}

impl ProcessPoolExecutor {
    /// Start `workers` processes up front; any spawn failure aborts the run
    pub fn spawn(command: &[String], workers: usize) -> FanoutResult<Self> {
        let mut started = Vec::with_capacity(workers);
        for _ in 0..workers {
            match WorkerProcess::spawn(command) {
                Ok(worker) => started.push(worker),
                // Already-started workers are torn down as `started` drops
                Err(e) => {
                    return Err(FanoutError::PoolSetup {
                        backend: "process",
                        workers,
                        reason: format!("could not start `{}`: {e}", command.join(" ")),
                    });
                }
            }
        }

        info!(
            "Started {} worker processes: {:?}",
            started.len(),
            started.iter().map(WorkerProcess::pid).collect::<Vec<_>>()
        );
        Ok(Self {
            command: command.to_vec(),
            workers: started,
        })
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Enqueue every partition at once and block until all have completed
    pub fn execute(self, partitions: Vec<Partition>, progress: &PartitionProgress) -> CompletionMap {
        let ProcessPoolExecutor { command, workers } = self;
        let mut completions = CompletionMap::new(partitions.len());

        let (work_tx, work_rx): (Sender<Partition>, Receiver<Partition>) = unbounded();
        let (done_tx, done_rx): (Sender<(usize, PartitionOutcome)>, Receiver<(usize, PartitionOutcome)>) =
            unbounded();

        for partition in partitions {
            if work_tx.send(partition).is_err() {
                break;
            }
        }
        drop(work_tx);

        let scoped = crossbeam::thread::scope(|s| {
            for (slot, worker) in workers.into_iter().enumerate() {
                let work_rx = work_rx.clone();
                let done_tx = done_tx.clone();
                let command = &command;
                s.spawn(move |_| drive_slot(slot, worker, command, work_rx, done_tx));
            }

            // Drop the originals so the collector sees the channel close
            drop(done_tx);

            for (index, outcome) in done_rx.iter() {
                progress.partition_done(outcome.as_ref().ok().map(Vec::len));
                completions.record(index, outcome);
            }
        });

        if scoped.is_err() {
            error!("A worker slot thread panicked; its partitions are treated as failed");
        }
        completions
    }
}

/// Feed partitions to one worker process until the queue drains
///
/// A worker that dies or garbles the stream fails only its in-flight partition;
/// the slot starts a fresh process for the next one.
fn drive_slot(
    slot: usize,
    worker: WorkerProcess,
    command: &[String],
    work_rx: Receiver<Partition>,
    done_tx: Sender<(usize, PartitionOutcome)>,
) {
    let mut worker = Some(worker);

    while let Ok(partition) = work_rx.recv() {
        if worker.is_none() {
            match WorkerProcess::spawn(command) {
                Ok(fresh) => {
                    info!("Slot {} restarted worker process {}", slot, fresh.pid());
                    worker = Some(fresh);
                }
                Err(e) => warn!("Slot {} could not restart worker: {}", slot, e),
            }
        }

        let outcome = match worker.as_mut() {
            Some(process) => process.call(&partition),
            None => Err(PartitionFailure::Spawn(format!(
                "slot {slot} has no running worker"
            ))),
        };

        if must_retire(&outcome) {
            worker = None;
        }

        if done_tx.send((partition.index, outcome)).is_err() {
            break; // Collector dropped
        }
    }
}

/// Whether the worker's stream state is unknown after `outcome`
fn must_retire(outcome: &PartitionOutcome) -> bool {
    matches!(
        outcome,
        Err(PartitionFailure::WorkerExited
            | PartitionFailure::Protocol(_)
            | PartitionFailure::Inconsistent(_))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_failure_is_pool_setup_error() {
        let command = vec!["/nonexistent/page-fanout-worker".to_string()];
        match ProcessPoolExecutor::spawn(&command, 2) {
            Err(FanoutError::PoolSetup { backend, workers, .. }) => {
                assert_eq!(backend, "process");
                assert_eq!(workers, 2);
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("spawn should fail"),
        }
    }

    #[test]
    fn test_stream_failures_retire_the_worker() {
        assert!(must_retire(&Err(PartitionFailure::WorkerExited)));
        assert!(must_retire(&Err(PartitionFailure::Protocol("eof".into()))));
        assert!(must_retire(&Err(PartitionFailure::Inconsistent(
            "reply for partition 3, expected 2".into()
        ))));

        // The worker answered in step; keep it
        assert!(!must_retire(&Ok(Vec::new())));
        assert!(!must_retire(&Err(PartitionFailure::Remote("bad page".into()))));
    }

    #[test]
    fn test_out_of_step_worker_is_replaced() {
        // The first process answers its first request twice, leaving a stale
        // line in the pipe; processes started after that behave.
        let script = r#"
if [ ! -e "$1" ]; then
  : > "$1"
  read line
  echo '{"status":"ok","index":99,"pages":[]}'
  echo '{"status":"ok","index":0,"pages":[]}'
fi
while read line; do
  idx=$(printf '%s' "$line" | sed 's/^{"index":\([0-9]*\).*/\1/')
  echo "{\"status\":\"ok\",\"index\":$idx,\"pages\":[]}"
done
"#;
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("answered");
        let command = vec![
            "sh".to_string(),
            "-c".to_string(),
            script.to_string(),
            "sh".to_string(),
            marker.display().to_string(),
        ];
        let pool = ProcessPoolExecutor::spawn(&command, 1).unwrap();

        let partitions = (0..3)
            .map(|index| Partition {
                index,
                items: Vec::new(),
                flags: Default::default(),
            })
            .collect();
        let progress = PartitionProgress::new(3, crate::parallel::Strategy::ProcessPool, false);
        let completions = pool.execute(partitions, &progress);

        assert_eq!(completions.completed(), 3);
        assert_eq!(completions.failed_indices(), vec![0]);
    }

    #[test]
    fn test_empty_command_is_rejected() {
        assert!(ProcessPoolExecutor::spawn(&[], 1).is_err());
    }
}
