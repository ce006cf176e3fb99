//! Sequential collection and folder runs.
//!
//! Each request gets its own copy of the shared variable bags; after it
//! finishes, its environment and runtime groups are merged back and seen by
//! the next request.

use std::sync::Arc;

use relay_domain::{Collection, CollectionItem, Folder, RequestItem, VariableMap, VariableScopes};
use tracing::{info, warn};

use crate::error::{ApplicationError, ApplicationResult};
use crate::lifecycle::{RequestContext, RunOptions, RunRequest};
use crate::ports::{
    CancellationToken, GatedEvents, HttpSend, RequestEvents, ResponseBodyStore, RunSummary,
    ScriptRunner,
};

/// What to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunTarget {
    /// Every request in the collection.
    Collection,
    /// Every request below the folder at this path of folder names.
    Folder(Vec<String>),
}

/// Outcome of a run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// One context per executed request, in execution order.
    pub results: Vec<RequestContext>,
    /// Counts over `results`.
    pub summary: RunSummary,
    /// Environment variables after the last request.
    pub environment: VariableMap,
    /// Runtime variables after the last request.
    pub runtime: VariableMap,
}

/// A request with the folder chain above it.
#[derive(Debug, Clone)]
struct PlannedRequest {
    folders: Vec<Folder>,
    item: RequestItem,
}

/// Runs requests one after another, honouring `setNextRequest` and `skipRequest`.
pub struct CollectionRunner<H: HttpSend, S: ScriptRunner, B: ResponseBodyStore> {
    request: RunRequest<H, S, B>,
}

impl<H: HttpSend, S: ScriptRunner, B: ResponseBodyStore> CollectionRunner<H, S, B> {
    /// Creates a runner over a request orchestrator.
    #[must_use]
    pub const fn new(request: RunRequest<H, S, B>) -> Self {
        Self { request }
    }

    /// Runs `target` within `collection`.
    ///
    /// `scopes.folders` and `scopes.request` are ignored; folder groups come
    /// from the folders themselves.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::NotFound` when the target folder does not exist.
    pub async fn run(
        &self,
        collection: &Collection,
        target: &RunTarget,
        scopes: VariableScopes,
        options: &RunOptions,
        events: Arc<dyn RequestEvents>,
        cancel: &CancellationToken,
    ) -> ApplicationResult<RunReport> {
        let (label, plan) = match target {
            RunTarget::Collection => (collection.name.clone(), plan(&collection.items, &[])),
            RunTarget::Folder(path) => {
                let (chain, folder) = find_folder(&collection.items, path)
                    .ok_or_else(|| ApplicationError::NotFound(format!("folder '{}'", path.join("/"))))?;
                (folder.name.clone(), plan(&folder.items, &chain))
            }
        };

        let gate = GatedEvents::new(events.as_ref(), cancel);
        info!(target = %label, requests = plan.len(), "Starting run");
        gate.emit(|e| e.folder_run_started(&label, plan.len()));

        let mut environment = scopes.environment.clone();
        let mut runtime = scopes.runtime.clone();
        let mut results = Vec::new();
        let mut summary = RunSummary::default();
        let mut index = 0;

        while let Some(planned) = plan.get(index) {
            if cancel.is_cancelled() {
                break;
            }

            let mut request_scopes = scopes.clone();
            request_scopes.environment = environment;
            request_scopes.runtime = runtime;
            request_scopes.folders = planned.folders.iter().map(|f| f.variables.clone()).collect();
            request_scopes.request = VariableMap::new();

            let ctx = self
                .request
                .run(
                    planned.item.clone(),
                    collection,
                    &planned.folders,
                    request_scopes,
                    options,
                    Arc::clone(&events),
                    cancel,
                )
                .await;

            environment = ctx.scopes.environment.clone();
            runtime = ctx.scopes.runtime.clone();
            tally(&mut summary, &ctx);
            gate.emit(|e| e.folder_request_completed(&label, ctx.uid(), &ctx.item.name));

            index = match ctx.next_request_name.as_deref() {
                None => index + 1,
                Some(name) => {
                    if let Some(position) = plan.iter().position(|p| p.item.name == name) {
                        position
                    } else {
                        warn!(next = name, "Next request not found, stopping run");
                        plan.len()
                    }
                }
            };
            results.push(ctx);
        }

        gate.emit(|e| e.folder_run_completed(&label, &summary));
        Ok(RunReport {
            results,
            summary,
            environment,
            runtime,
        })
    }
}

fn tally(summary: &mut RunSummary, ctx: &RequestContext) {
    if ctx.error.is_some() {
        summary.errored += 1;
    } else if ctx.skipped {
        summary.skipped += 1;
    } else {
        summary.completed += 1;
    }
    summary.passed += ctx.passed_count();
    summary.failed += ctx.failed_count();
}

/// Depth-first list of requests with their folder chains (folders without children).
fn plan(items: &[CollectionItem], chain: &[Folder]) -> Vec<PlannedRequest> {
    let mut planned = Vec::new();
    for item in items {
        match item {
            CollectionItem::Request(request) => planned.push(PlannedRequest {
                folders: chain.to_vec(),
                item: request.clone(),
            }),
            CollectionItem::Folder(folder) => {
                let mut nested = chain.to_vec();
                nested.push(Folder {
                    items: Vec::new(),
                    ..folder.clone()
                });
                planned.extend(plan(&folder.items, &nested));
            }
        }
    }
    planned
}

/// Finds a folder by name path; returns the chain down to and including it.
fn find_folder<'a>(items: &'a [CollectionItem], path: &[String]) -> Option<(Vec<Folder>, &'a Folder)> {
    let (first, rest) = path.split_first()?;
    let folder = items.iter().find_map(|item| match item {
        CollectionItem::Folder(f) if f.name == *first => Some(f),
        _ => None,
    })?;
    let shallow = Folder {
        items: Vec::new(),
        ..folder.clone()
    };
    if rest.is_empty() {
        return Some((vec![shallow], folder));
    }
    let (mut chain, found) = find_folder(&folder.items, rest)?;
    chain.insert(0, shallow);
    Some((chain, found))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ports::{
        BodyStoreError, FixedClock, OutgoingRequest, ScriptError, ScriptInvocation, TransportError,
    };
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use relay_domain::{BodyLocation, Headers, HttpResponse, ScriptExecutionResult};
    use serde_json::{Value, json};
    use std::sync::Mutex;
    use std::time::Duration;

    struct EchoHttp(Mutex<Vec<String>>);

    impl HttpSend for EchoHttp {
        async fn send(&self, request: &OutgoingRequest) -> Result<HttpResponse, TransportError> {
            self.0.lock().unwrap().push(request.url.path().to_string());
            Ok(HttpResponse::new(200, Headers::new(), Vec::new(), Duration::from_millis(1)))
        }
    }

    /// Scripts are tiny commands: `count` bumps a runtime counter,
    /// `next:<name>` jumps, `skip` skips, `stop` ends the run.
    struct CommandScripts;

    impl ScriptRunner for CommandScripts {
        async fn run_script(
            &self,
            invocation: ScriptInvocation,
        ) -> Result<ScriptExecutionResult, ScriptError> {
            let mut result = ScriptExecutionResult::unchanged(
                invocation.scopes.environment.clone(),
                invocation.scopes.runtime.clone(),
                invocation.request.clone(),
            );
            for command in invocation.script.split(';').map(str::trim) {
                match command {
                    "count" => {
                        let count = result
                            .runtime_variables
                            .get("count")
                            .and_then(Value::as_i64)
                            .unwrap_or(0);
                        result.runtime_variables.insert("count".into(), json!(count + 1));
                    }
                    "skip" => result.skip_request = true,
                    "stop" => result.next_request_name = Some(String::new()),
                    other => {
                        if let Some(name) = other.strip_prefix("next:") {
                            result.next_request_name = Some(name.to_string());
                        }
                    }
                }
            }
            Ok(result)
        }

        async fn evaluate_expression(
            &self,
            _expression: String,
            _invocation: ScriptInvocation,
        ) -> Result<Value, ScriptError> {
            Ok(Value::Null)
        }
    }

    struct NoBodies;

    impl ResponseBodyStore for NoBodies {
        async fn persist(&self, uid: &str, _body: &[u8]) -> Result<BodyLocation, BodyStoreError> {
            Ok(BodyLocation::Memory {
                key: uid.to_string(),
            })
        }
    }

    #[derive(Default)]
    struct FolderEvents(Mutex<Vec<String>>);

    impl RequestEvents for FolderEvents {
        fn folder_run_started(&self, folder: &str, total_requests: usize) {
            self.0.lock().unwrap().push(format!("start {folder} {total_requests}"));
        }
        fn folder_request_completed(&self, _folder: &str, _uid: &str, name: &str) {
            self.0.lock().unwrap().push(format!("done {name}"));
        }
        fn folder_run_completed(&self, folder: &str, summary: &RunSummary) {
            self.0
                .lock()
                .unwrap()
                .push(format!("end {folder} {}", summary.completed));
        }
    }

    fn request(name: &str, post: &str) -> CollectionItem {
        let mut item = RequestItem::get(name, format!("http://api.test/{name}"));
        item.scripts.post_response = post.to_string();
        CollectionItem::Request(item)
    }

    fn runner(http: Arc<EchoHttp>) -> CollectionRunner<EchoHttp, CommandScripts, NoBodies> {
        let clock = FixedClock(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        CollectionRunner::new(RunRequest::new(
            http,
            Arc::new(CommandScripts),
            Arc::new(NoBodies),
            Arc::new(clock),
        ))
    }

    async fn run_target(
        collection: &Collection,
        target: RunTarget,
    ) -> (ApplicationResult<RunReport>, Vec<String>, Vec<String>) {
        let http = Arc::new(EchoHttp(Mutex::new(Vec::new())));
        let events = Arc::new(FolderEvents::default());
        let report = runner(Arc::clone(&http))
            .run(
                collection,
                &target,
                VariableScopes::new(),
                &RunOptions::default(),
                Arc::clone(&events) as Arc<dyn RequestEvents>,
                &CancellationToken::new(),
            )
            .await;
        let sent = http.0.lock().unwrap().clone();
        let seen = events.0.lock().unwrap().clone();
        (report, sent, seen)
    }

    #[tokio::test]
    async fn runtime_variables_flow_between_requests() {
        let mut collection = Collection::new("api", "/tmp");
        collection.items = vec![request("a", "count"), request("b", "count"), request("c", "count")];

        let (report, sent, events) = run_target(&collection, RunTarget::Collection).await;
        let report = report.unwrap();

        assert_eq!(sent, vec!["/a", "/b", "/c"]);
        assert_eq!(report.runtime.get("count").and_then(Value::as_i64), Some(3));
        assert_eq!(report.summary.completed, 3);
        assert_eq!(
            events,
            vec!["start api 3", "done a", "done b", "done c", "end api 3"]
        );
    }

    #[tokio::test]
    async fn set_next_request_jumps_and_unknown_names_stop() {
        let mut collection = Collection::new("api", "/tmp");
        collection.items = vec![
            request("a", "next:c"),
            request("b", ""),
            request("c", "stop"),
            request("d", ""),
        ];

        let (report, sent, _) = run_target(&collection, RunTarget::Collection).await;

        assert_eq!(sent, vec!["/a", "/c"]);
        assert_eq!(report.unwrap().results.len(), 2);
    }

    #[tokio::test]
    async fn folder_runs_only_cover_the_folder_and_use_its_variables() {
        let mut inner = Folder::new("users");
        inner.variables.insert("segment".into(), json!("users"));
        let mut item = RequestItem::get("list", "http://api.test/{{segment}}");
        item.scripts.pre_request = "skip".into();
        let listed = RequestItem::get("show", "http://api.test/{{segment}}/1");
        let inner = inner
            .with_item(CollectionItem::Request(item))
            .with_item(CollectionItem::Request(listed));

        let mut collection = Collection::new("api", "/tmp");
        collection.items = vec![request("root", ""), CollectionItem::Folder(inner)];

        let (report, sent, events) =
            run_target(&collection, RunTarget::Folder(vec!["users".into()])).await;
        let report = report.unwrap();

        assert_eq!(sent, vec!["/users/1"]);
        assert_eq!(report.summary.skipped, 1);
        assert_eq!(report.summary.completed, 1);
        assert_eq!(events.first().map(String::as_str), Some("start users 2"));
    }

    #[tokio::test]
    async fn missing_folders_are_reported() {
        let collection = Collection::new("api", "/tmp");
        let (report, _, _) =
            run_target(&collection, RunTarget::Folder(vec!["nope".into()])).await;
        assert!(matches!(report, Err(ApplicationError::NotFound(_))));
    }

    #[test]
    fn plan_keeps_folder_chains() {
        let nested = Folder::new("inner").with_item(request("deep", ""));
        let outer = Folder::new("outer").with_item(CollectionItem::Folder(nested));
        let planned = plan(&[CollectionItem::Folder(outer), request("top", "")], &[]);

        let names: Vec<_> = planned
            .iter()
            .map(|p| {
                let chain: Vec<_> = p.folders.iter().map(|f| f.name.as_str()).collect();
                format!("{}:{}", chain.join("/"), p.item.name)
            })
            .collect();
        assert_eq!(names, vec!["outer/inner:deep", ":top"]);
        assert!(planned[0].folders.iter().all(|f| f.items.is_empty()));
    }
}
