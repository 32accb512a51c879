#[cfg(test)]
mod tests {
    use std::ffi::OsString;
    use std::net::SocketAddr;
    use std::path::PathBuf;
    use std::sync::{Arc, OnceLock};

    use anyhow::{Context, Result, bail};
    use axum::extract::{Path, State};
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::routing::get;
    use axum::{Json, Router};
    use client_sdk::{RecordClient, RecordStore, TransportError};
    use common::{ConnectionStatus, DataPoint, Record, RecordId, RecordInput};
    use sync_core::{DeleteOutcome, LOAD_ERROR_MESSAGE, LoadOutcome, SubmitOutcome, Synchronizer};
    use tokio::process::Command;
    use tokio::sync::Mutex;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    enum ListMode {
        #[default]
        Normal,
        NotArray,
        ServerError,
    }

    #[derive(Debug, Default)]
    struct StubState {
        records: Vec<Record>,
        next_id: RecordId,
        list_mode: ListMode,
        fail_deletes: bool,
    }

    type Stub = Arc<Mutex<StubState>>;

    fn seeded(records: Vec<Record>) -> StubState {
        let next_id = records.iter().map(|r| r.id).max().unwrap_or(0);
        StubState {
            records,
            next_id,
            ..StubState::default()
        }
    }

    async fn start_stub(state: StubState) -> Result<(String, Stub)> {
        let stub: Stub = Arc::new(Mutex::new(state));
        let app = Router::new()
            .route("/items", get(list_items).post(create_item))
            .route(
                "/items/{id}",
                get(get_item).put(update_item).delete(delete_item),
            )
            .route("/data", get(data_points))
            .route("/status", get(status))
            .with_state(stub.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("failed to bind stub store")?;
        let addr: SocketAddr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok((format!("http://{addr}"), stub))
    }

    async fn list_items(State(stub): State<Stub>) -> Response {
        let state = stub.lock().await;
        match state.list_mode {
            ListMode::Normal => Json(state.records.clone()).into_response(),
            ListMode::NotArray => {
                Json(serde_json::json!({ "detail": "database offline" })).into_response()
            }
            ListMode::ServerError => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }

    async fn create_item(
        State(stub): State<Stub>,
        Json(input): Json<RecordInput>,
    ) -> (StatusCode, Json<Record>) {
        let mut state = stub.lock().await;
        state.next_id += 1;
        let record = Record::new(state.next_id, input.title, input.description);
        state.records.push(record.clone());
        (StatusCode::CREATED, Json(record))
    }

    async fn get_item(
        State(stub): State<Stub>,
        Path(id): Path<RecordId>,
    ) -> Result<Json<Record>, StatusCode> {
        let state = stub.lock().await;
        state
            .records
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .map(Json)
            .ok_or(StatusCode::NOT_FOUND)
    }

    async fn update_item(
        State(stub): State<Stub>,
        Path(id): Path<RecordId>,
        Json(input): Json<RecordInput>,
    ) -> Result<Json<Record>, StatusCode> {
        let mut state = stub.lock().await;
        let record = state
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StatusCode::NOT_FOUND)?;
        record.title = input.title;
        record.description = input.description;
        Ok(Json(record.clone()))
    }

    async fn delete_item(State(stub): State<Stub>, Path(id): Path<RecordId>) -> StatusCode {
        let mut state = stub.lock().await;
        if state.fail_deletes {
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
        let before = state.records.len();
        state.records.retain(|r| r.id != id);
        if state.records.len() == before {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::NO_CONTENT
        }
    }

    async fn data_points() -> Json<Vec<DataPoint>> {
        Json(
            [("Jan", 100.0, 1500.0), ("Feb", 120.0, 1800.0), ("Mar", 140.0, 2100.0)]
                .into_iter()
                .map(|(month, sales, revenue)| DataPoint {
                    month: month.to_string(),
                    sales,
                    revenue,
                })
                .collect(),
        )
    }

    async fn status() -> Json<ConnectionStatus> {
        Json(ConnectionStatus {
            connected: true,
            message: "Database connection successful".to_string(),
        })
    }

    #[tokio::test]
    async fn sdk_crud_roundtrip_against_stub_store() -> Result<()> {
        let (base_url, _stub) = start_stub(StubState::default()).await?;
        let client = RecordClient::new(&base_url);

        let created = client.create(&RecordInput::new("Milk", "2 litres")).await?;
        assert_eq!(created, Record::new(1, "Milk", "2 litres"));

        assert_eq!(client.list().await?, vec![created.clone()]);
        assert_eq!(client.get(1).await?, created);

        let updated = client.update(1, &RecordInput::new("Milk", "1 litre")).await?;
        assert_eq!(updated.description, "1 litre");

        client.delete(1).await?;
        match client.get(1).await {
            Err(TransportError::Status { status, .. }) => {
                assert_eq!(status, StatusCode::NOT_FOUND)
            }
            other => bail!("expected 404 after delete, got {other:?}"),
        }

        Ok(())
    }

    #[tokio::test]
    async fn synchronizer_tracks_store_through_an_edit_cycle() -> Result<()> {
        let (base_url, stub) =
            start_stub(seeded(vec![Record::new(1, "A", "a"), Record::new(2, "B", "b")])).await?;
        let mut sync = Synchronizer::new(RecordClient::new(&base_url));

        assert_eq!(sync.load().await, LoadOutcome::Loaded(2));

        let outcome = sync.submit_input(RecordInput::new("C", "c")).await;
        assert_eq!(outcome, SubmitOutcome::Created(Record::new(3, "C", "c")));

        assert!(sync.begin_edit_id(1));
        let outcome = sync.submit_input(RecordInput::new("A2", "a2")).await;
        assert_eq!(outcome, SubmitOutcome::Updated(Record::new(1, "A2", "a2")));
        assert_eq!(sync.state().editing(), None);

        assert_eq!(sync.delete(2).await, DeleteOutcome::Deleted);

        let remote = stub.lock().await.records.clone();
        assert_eq!(sync.state().records(), remote.as_slice());
        assert_eq!(
            sync.state().records(),
            &[Record::new(1, "A2", "a2"), Record::new(3, "C", "c")]
        );

        Ok(())
    }

    #[tokio::test]
    async fn non_array_list_becomes_load_error() -> Result<()> {
        let (base_url, stub) = start_stub(StubState::default()).await?;
        stub.lock().await.list_mode = ListMode::NotArray;
        let client = RecordClient::new(&base_url);

        assert!(matches!(
            client.list().await,
            Err(TransportError::Malformed { .. })
        ));

        let mut sync = Synchronizer::new(client);
        assert_eq!(sync.load().await, LoadOutcome::Failed);
        assert!(sync.state().records().is_empty());
        assert_eq!(sync.state().error(), Some(LOAD_ERROR_MESSAGE));
        assert!(!sync.state().is_loading());

        Ok(())
    }

    #[tokio::test]
    async fn server_error_on_list_surfaces_load_error() -> Result<()> {
        let (base_url, stub) = start_stub(seeded(vec![Record::new(1, "A", "a")])).await?;
        stub.lock().await.list_mode = ListMode::ServerError;
        let client = RecordClient::new(&base_url);

        assert!(matches!(
            client.list().await,
            Err(TransportError::Status { .. })
        ));

        let mut sync = Synchronizer::new(client);
        assert_eq!(sync.load().await, LoadOutcome::Failed);
        assert!(sync.state().records().is_empty());
        assert_eq!(sync.state().error(), Some(LOAD_ERROR_MESSAGE));

        Ok(())
    }

    #[tokio::test]
    async fn failed_delete_leaves_local_collection_alone() -> Result<()> {
        let (base_url, stub) = start_stub(seeded(vec![Record::new(1, "A", "a")])).await?;
        let mut sync = Synchronizer::new(RecordClient::new(&base_url));
        sync.load().await;

        stub.lock().await.fail_deletes = true;

        assert_eq!(sync.delete(1).await, DeleteOutcome::Failed);
        assert_eq!(sync.state().records(), &[Record::new(1, "A", "a")]);

        Ok(())
    }

    #[tokio::test]
    async fn read_only_views_fetch_data_and_status() -> Result<()> {
        let (base_url, _stub) = start_stub(StubState::default()).await?;
        let client = RecordClient::new(&base_url);

        let points = client.data_points().await?;
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].month, "Jan");

        let status = client.status().await?;
        assert!(status.connected);

        Ok(())
    }

    #[tokio::test]
    async fn cli_add_then_list_against_stub_store() -> Result<()> {
        let (base_url, stub) = start_stub(seeded(vec![Record::new(1, "A", "a")])).await?;

        let output = run_cli(&["--server-url", &base_url, "add", "Milk", "2 litres"]).await?;
        assert!(output.contains("created #2 Milk: 2 litres"));

        let output = run_cli(&["--server-url", &base_url, "list"]).await?;
        assert!(output.contains("#1 A: a"));
        assert!(output.contains("#2 Milk: 2 litres"));

        assert_eq!(stub.lock().await.records.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn cli_update_keeps_fields_left_out() -> Result<()> {
        let (base_url, stub) =
            start_stub(seeded(vec![Record::new(1, "A", "a"), Record::new(2, "B", "b")])).await?;

        let output = run_cli(&["--server-url", &base_url, "update", "2", "--title", "B2"]).await?;
        assert!(output.contains("updated #2 B2: b"));

        assert_eq!(
            stub.lock().await.records,
            vec![Record::new(1, "A", "a"), Record::new(2, "B2", "b")]
        );
        Ok(())
    }

    #[tokio::test]
    async fn cli_list_fails_on_malformed_payload() -> Result<()> {
        let (base_url, stub) = start_stub(StubState::default()).await?;
        stub.lock().await.list_mode = ListMode::NotArray;

        let output = Command::new(binary_path("recordsync")?)
            .args(["--server-url", base_url.as_str(), "list"])
            .output()
            .await
            .context("failed to execute recordsync")?;

        assert!(!output.status.success());
        assert!(String::from_utf8_lossy(&output.stderr).contains(LOAD_ERROR_MESSAGE));
        Ok(())
    }

    async fn run_cli(args: &[&str]) -> Result<String> {
        let cli_bin = binary_path("recordsync")?;
        let output = Command::new(cli_bin)
            .args(args)
            .output()
            .await
            .context("failed to execute recordsync")?;

        if !output.status.success() {
            bail!(
                "recordsync failed: {}",
                String::from_utf8_lossy(&output.stderr)
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn binary_path(name: &str) -> Result<PathBuf> {
        let workspace_root = workspace_root()?;
        ensure_binaries_built(&workspace_root)?;
        let mut path = workspace_root.join("target").join("debug").join(name);

        if let Some(suffix) = std::env::consts::EXE_SUFFIX.strip_prefix('.') {
            let mut filename = OsString::from(name);
            filename.push(".");
            filename.push(suffix);
            path = workspace_root.join("target").join("debug").join(filename);
        }

        if !path.exists() {
            bail!("expected binary does not exist: {}", path.display());
        }

        Ok(path)
    }

    fn workspace_root() -> Result<PathBuf> {
        let crate_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        crate_dir
            .parent()
            .and_then(|p| p.parent())
            .map(PathBuf::from)
            .context("failed to resolve workspace root")
    }

    fn ensure_binaries_built(workspace_root: &PathBuf) -> Result<()> {
        static BUILD_RESULT: OnceLock<std::result::Result<(), String>> = OnceLock::new();

        let result = BUILD_RESULT.get_or_init(|| {
            let status = std::process::Command::new(env!("CARGO"))
                .arg("build")
                .arg("-p")
                .arg("cli-client")
                .current_dir(workspace_root)
                .status();
            match status {
                Ok(status) if status.success() => Ok(()),
                Ok(status) => Err(format!("cargo build exited with {status}")),
                Err(err) => Err(err.to_string()),
            }
        });

        if let Err(message) = result {
            bail!("failed to build recordsync: {message}");
        }

        Ok(())
    }
}
