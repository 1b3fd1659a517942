use std::process::ExitCode;

use taskid_runtime::{spawn, yield_now, Runtime};

/// Spawns a few tasks that log across a yield, so each record carries the
/// id of the task that emitted it.
fn main() -> ExitCode {
    if let Err(err) = taskid::init_logging("info") {
        eprintln!("failed to install subscriber: {err}");
        return ExitCode::FAILURE;
    }

    if taskid::init().is_err() {
        return ExitCode::FAILURE;
    }

    let runtime = Runtime::new(64);
    runtime.run(async {
        let workers: Vec<_> = (0..4)
            .map(|worker| {
                spawn(async move {
                    tracing::info!(worker, "started");
                    yield_now().await;
                    tracing::info!(worker, "resumed");
                    taskid::resolve_current_unit_id()
                })
            })
            .collect();

        for handle in workers {
            let id = handle.await;
            tracing::info!(%id, "worker joined");
        }
    });

    ExitCode::SUCCESS
}
