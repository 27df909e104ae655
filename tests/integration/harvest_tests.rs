//! Integration tests for the harvester
//!
//! These tests use wiremock to serve a small catalog and drive the full
//! discovery, fetch, extract and store cycle end-to-end.

use std::path::Path;
use tempfile::TempDir;
use wheel_harvest::config::{HarvestConfig, PacingConfig};
use wheel_harvest::output::load_coverage;
use wheel_harvest::renderer::HttpSessionFactory;
use wheel_harvest::{Orchestrator, ShutdownSignal, TrimRecord};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CATALOG_ROOT: &str = r#"<html><body>
  <form id="vehicle_form" method="get">
    <select id="auto_vendor" name="vendor">
      <option value="">Make</option>
      <option value="audi">Audi</option>
    </select>
    <select id="auto_year" name="year">
      <option value="">Year</option>
      <option value="2024">2024</option>
    </select>
    <select id="auto_model" name="model"></select>
    <span class="select2-selection" aria-labelledby="select2-auto_model-container">Model</span>
  </form>
  <ul class="select2-results__options">
    <li class="select2-results__option select2-results__option--selectable">Model</li>
    <li class="select2-results__option select2-results__option--selectable">A6 Allroad</li>
    <li class="select2-results__option select2-results__option--selectable">A4</li>
    <li class="select2-results__option select2-results__option--selectable">Q8 E-Tron</li>
  </ul>
</body></html>"#;

const A4_PAGE: &str = r#"<html><body>
  <h1 id="title-header" data-make-name="Audi" data-model-name="A4" data-year="2024">Audi A4 2024</h1>
  <div class="trims-list">
    <div class="panel region-trim-usdm" id="trim-101">
      <div class="panel-hdr">
        <span class="panel-hdr-trim-name" data-trim-name="2.0 TFSI">2.0 TFSI</span>
        <span>201 hp | 150 kW</span>
      </div>
      <ul>
        <li class="element-parameter"><span class="parameter-name">Bolt Pattern (PCD)</span>: 5x112</li>
      </ul>
      <table class="table-ws">
        <tbody>
          <tr class="stock">
            <td>245/40R18</td>
            <td>8Jx18</td>
            <td>35<br>40</td>
            <td><span class="metric">140</span><span class="imperial">5.5</span></td>
            <td><span class="metric">11</span><span class="imperial">25.0</span></td>
            <td><span class="metric">3.0</span><span class="imperial">44.0</span></td>
          </tr>
        </tbody>
      </table>
    </div>
    <div class="panel region-trim-eudm" id="trim-102">
      <div class="panel-hdr"><span class="panel-hdr-trim-name">35 TDI</span></div>
      <table class="table-ws"><tbody>
        <tr><td>225/50R17</td><td>7Jx17</td><td>29</td><td>5.2</td><td>22</td><td>41</td></tr>
      </tbody></table>
    </div>
  </div>
</body></html>"#;

const Q8_PAGE: &str = r#"<html><body>
  <h1 id="title-header" data-make-name="Audi" data-model-name="Q8 e-tron" data-year="2024">Audi Q8 e-tron 2024</h1>
  <div class="trims-list">
    <div class="panel region-trim-eudm" id="trim-201">
      <div class="panel-hdr"><span class="panel-hdr-trim-name">50 quattro</span></div>
    </div>
  </div>
</body></html>"#;

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body.to_string())
        .insert_header("content-type", "text/html; charset=utf-8")
}

/// Starts a server with the full catalog mounted
async fn start_catalog() -> MockServer {
    let server = MockServer::start().await;
    mount_catalog(&server).await;
    server
}

/// Mounts the catalog: the filter form, one flaky model and two good ones
///
/// Mocks mounted earlier take precedence, so a test can put one-off
/// responses in front of these.
async fn mount_catalog(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(CATALOG_ROOT))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/size/audi/a6-allroad/2024/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/size/audi/a4/2024/"))
        .respond_with(html(A4_PAGE))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/size/audi/q8-e-tron/2024/"))
        .respond_with(html(Q8_PAGE))
        .mount(server)
        .await;
}

/// Creates a single-task configuration pointed at the mock catalog
fn create_test_config(base_url: &str, results_dir: &Path) -> HarvestConfig {
    let mut config = HarvestConfig::default();
    config.harvest.workers = 1;
    config.catalog.base_url = format!("{}/", base_url);
    config.catalog.navigation_timeout_ms = 5_000;
    config.catalog.selector_timeout_ms = 1_000;
    config.targets.makes = vec!["audi".to_string()];
    config.targets.first_year = 2024;
    config.targets.last_year = 2024;
    config.retry.max_attempts = 2;
    config.retry.initial_backoff_ms = 1;
    config.pacing = PacingConfig::immediate();
    config.output.results_dir = results_dir.to_string_lossy().into_owned();
    config
}

async fn request_count(server: &MockServer, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == request_path)
        .count()
}

async fn total_requests(server: &MockServer) -> usize {
    server.received_requests().await.unwrap_or_default().len()
}

fn read_records(file: &Path) -> Vec<TrimRecord> {
    let text = std::fs::read_to_string(file).expect("stored file should exist");
    serde_json::from_str(&text).expect("stored file should be a record array")
}

#[tokio::test]
async fn test_full_harvest_single_task() {
    let server = start_catalog().await;
    let results = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), results.path());

    let factory = HttpSessionFactory::new(&config.catalog);
    let orchestrator = Orchestrator::new(config, factory).unwrap();
    let summary = orchestrator.run(ShutdownSignal::never()).await.unwrap();

    assert!(!summary.interrupted);
    assert_eq!(summary.tasks_pending, 1);
    assert_eq!(summary.tasks_completed, 1);
    assert_eq!(summary.models_discovered, 3);
    assert_eq!(summary.targets_saved, 1);
    assert_eq!(summary.targets_empty, 1);
    assert_eq!(summary.targets_failed, 1);

    let task_dir = results.path().join("audi").join("2024");

    // The staggered offset cell splits into front and rear values.
    let records = read_records(&task_dir.join("audi__a4__2024.json"));
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.make, "Audi");
    assert_eq!(record.model, "A4");
    assert_eq!(record.year, 2024);
    assert_eq!(record.engine.as_deref(), Some("2.0 TFSI"));
    assert_eq!(record.hp, Some(201));
    assert_eq!(record.bolt_pattern.as_deref(), Some("5x112"));
    assert_eq!(record.tires.len(), 1);

    let row = &record.tires[0];
    assert!(row.original_equipment);
    assert_eq!(row.offset.front.as_deref(), Some("35"));
    assert_eq!(row.offset.rear.as_deref(), Some("40"));
    assert_eq!(row.tire_weight.front.as_deref(), Some("25"));
    assert_eq!(row.max_psi.rear.as_deref(), Some("44"));

    // An identified page without USA trims is stored as an empty array.
    let empty = std::fs::read_to_string(task_dir.join("audi__q8-e-tron__2024.json")).unwrap();
    assert_eq!(empty, "[]");

    // Retry exhaustion leaves no file and does not block the later models.
    assert!(!task_dir.join("audi__a6-allroad__2024.json").exists());
    assert_eq!(request_count(&server, "/size/audi/a6-allroad/2024/").await, 2);

    assert!(task_dir.join(".done").exists());
}

#[tokio::test]
async fn test_discovery_retries_unavailable_catalog() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_catalog(&server).await;

    let results = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), results.path());

    let factory = HttpSessionFactory::new(&config.catalog);
    let orchestrator = Orchestrator::new(config, factory).unwrap();
    let summary = orchestrator.run(ShutdownSignal::never()).await.unwrap();

    assert_eq!(summary.models_discovered, 3);
    let task_dir = results.path().join("audi").join("2024");
    assert_eq!(read_records(&task_dir.join("audi__a4__2024.json")).len(), 1);
    assert!(task_dir.join(".done").exists());
}

#[tokio::test]
async fn test_slow_trims_list_is_refetched() {
    let server = MockServer::start().await;
    let title_only = r#"<html><body>
      <h1 id="title-header" data-make-name="Audi" data-model-name="A4" data-year="2024">Audi A4 2024</h1>
      <div class="trims-list"></div>
    </body></html>"#;
    Mock::given(method("GET"))
        .and(path("/size/audi/a4/2024/"))
        .respond_with(html(title_only))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_catalog(&server).await;

    let results = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), results.path());

    let factory = HttpSessionFactory::new(&config.catalog);
    let orchestrator = Orchestrator::new(config, factory).unwrap();
    orchestrator.run(ShutdownSignal::never()).await.unwrap();

    let task_dir = results.path().join("audi").join("2024");
    let records = read_records(&task_dir.join("audi__a4__2024.json"));
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].hp, Some(201));
    assert_eq!(request_count(&server, "/size/audi/a4/2024/").await, 2);
}

#[tokio::test]
async fn test_second_run_makes_no_requests() {
    let server = start_catalog().await;
    let results = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), results.path());

    let factory = HttpSessionFactory::new(&config.catalog);
    let orchestrator = Orchestrator::new(config.clone(), factory).unwrap();
    orchestrator.run(ShutdownSignal::never()).await.unwrap();
    let after_first = total_requests(&server).await;
    assert!(after_first > 0);

    let factory = HttpSessionFactory::new(&config.catalog);
    let orchestrator = Orchestrator::new(config, factory).unwrap();
    let summary = orchestrator.run(ShutdownSignal::never()).await.unwrap();

    assert_eq!(summary.tasks_pending, 0);
    assert_eq!(summary.tasks_completed, 0);
    assert_eq!(total_requests(&server).await, after_first);
}

#[tokio::test]
async fn test_saved_targets_are_not_refetched() {
    let server = start_catalog().await;
    let results = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), results.path());

    // A previous run stored the A4 but died before marking the task complete.
    let task_dir = results.path().join("audi").join("2024");
    std::fs::create_dir_all(&task_dir).unwrap();
    std::fs::write(task_dir.join("audi__a4__2024.json"), "[]").unwrap();

    let factory = HttpSessionFactory::new(&config.catalog);
    let orchestrator = Orchestrator::new(config, factory).unwrap();
    let summary = orchestrator.run(ShutdownSignal::never()).await.unwrap();

    assert_eq!(summary.targets_skipped, 1);
    assert_eq!(request_count(&server, "/size/audi/a4/2024/").await, 0);
    assert_eq!(
        std::fs::read_to_string(task_dir.join("audi__a4__2024.json")).unwrap(),
        "[]"
    );
    assert!(task_dir.join(".done").exists());
}

#[tokio::test]
async fn test_unreachable_catalog_still_completes_task() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let results = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), results.path());

    let factory = HttpSessionFactory::new(&config.catalog);
    let orchestrator = Orchestrator::new(config, factory).unwrap();
    let summary = orchestrator.run(ShutdownSignal::never()).await.unwrap();

    // Discovery finds nothing, which is a valid answer for a (make, year) pair.
    assert_eq!(summary.models_discovered, 0);
    assert_eq!(summary.tasks_completed, 1);
    assert!(results.path().join("audi/2024/.done").exists());
}

#[tokio::test]
async fn test_coverage_after_harvest() {
    let server = start_catalog().await;
    let results = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), results.path());

    let factory = HttpSessionFactory::new(&config.catalog);
    let orchestrator = Orchestrator::new(config, factory).unwrap();
    orchestrator.run(ShutdownSignal::never()).await.unwrap();

    let coverage = load_coverage(results.path()).unwrap();
    assert_eq!(coverage.makes, 1);
    assert_eq!(coverage.completed_tasks, 1);
    assert_eq!(coverage.stored_files, 2);
    assert_eq!(coverage.empty_files, 1);
    assert_eq!(coverage.trim_records, 1);
    assert_eq!(coverage.unreadable_files, 0);
}
