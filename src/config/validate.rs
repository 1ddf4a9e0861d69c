// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{PipelineFile, RawPipelineFile};
use crate::errors::{Result, WindagError};

impl TryFrom<RawPipelineFile> for PipelineFile {
    type Error = WindagError;

    fn try_from(raw: RawPipelineFile) -> std::result::Result<Self, Self::Error> {
        ensure_has_tasks(&raw)?;
        validate_schedule(&raw)?;
        validate_task_dependencies(&raw)?;
        let order = declaration_order(&raw)?;
        Ok(PipelineFile::new_unchecked(raw.schedule, raw.task, order))
    }
}

fn ensure_has_tasks(cfg: &RawPipelineFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(WindagError::ConfigError(
            "pipeline must contain at least one [task.<id>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_schedule(cfg: &RawPipelineFile) -> Result<()> {
    if cfg.schedule.workers == 0 {
        return Err(WindagError::ConfigError(
            "[schedule].workers must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.schedule.poll_interval_ms == 0 {
        return Err(WindagError::ConfigError(
            "[schedule].poll_interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_task_dependencies(cfg: &RawPipelineFile) -> Result<()> {
    for (id, task) in cfg.task.iter() {
        if task.cmd.trim().is_empty() {
            return Err(WindagError::ConfigError(format!("task '{id}' has an empty `cmd`")));
        }
        for dep in task.after.iter() {
            if dep == id {
                return Err(WindagError::ConfigError(format!(
                    "task '{id}' cannot depend on itself in `after`"
                )));
            }
            if !cfg.task.contains_key(dep) {
                return Err(WindagError::ConfigError(format!(
                    "task '{id}' has unknown dependency '{dep}' in `after`"
                )));
            }
        }
    }
    Ok(())
}

/// Topological order of the task ids; tasks must be declared on the
/// schedule builder in this order.
fn declaration_order(cfg: &RawPipelineFile) -> Result<Vec<String>> {
    // Edge direction: dep -> task
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for id in cfg.task.keys() {
        graph.add_node(id.as_str());
    }
    for (id, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            graph.add_edge(dep.as_str(), id.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
        Err(cycle) => Err(WindagError::DagCycle(format!(
            "cycle detected in task graph involving task '{}'",
            cycle.node_id()
        ))),
    }
}
