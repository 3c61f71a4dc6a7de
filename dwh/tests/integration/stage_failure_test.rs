use dwh::catalog::Catalog;
use dwh::error::ErrorKind;
use dwh::mart::MartTable;
use dwh::orchestrator::{RunMode, Stage, StageOrchestrator};
use dwh::staging::StagingTable;
use dwh::store::memory::MemoryStore;
use dwh::test_utils::fixture::{BronzeFixture, table_rows};
use dwh::test_utils::test_store_wrapper::TestStoreWrapper;
use dwh_config::shared::{LayerConfig, LoadConfig};
use dwh_telemetry::tracing::init_test_tracing;

fn orchestrator(
    store: &MemoryStore,
    warehouse: &TestStoreWrapper<MemoryStore>,
) -> StageOrchestrator<MemoryStore, TestStoreWrapper<MemoryStore>> {
    StageOrchestrator::new(
        store.clone(),
        warehouse.clone(),
        &LayerConfig::default(),
        LoadConfig::default(),
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_dimension_write_stops_the_run() {
    init_test_tracing();

    let store = MemoryStore::new();
    let catalog = Catalog::default();
    BronzeFixture::new()
        .sale("SO1", "P1", 1, 20240105, 1, 10)
        .seed(&store, &catalog)
        .await
        .unwrap();
    let warehouse = TestStoreWrapper::wrap(store.clone());
    let products = catalog.mart_table(MartTable::DimProducts);
    warehouse.fail_writes_to(products.name.clone());

    let mut orchestrator = orchestrator(&store, &warehouse);
    orchestrator.load_staging().await.unwrap();
    assert_eq!(orchestrator.stage(), Stage::StagingDone);

    let err = orchestrator.load_dimensions().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StoreWriteFailed);
    assert_eq!(orchestrator.stage(), Stage::Failed);

    // Tables committed before the failure stay committed.
    let silver_sales = catalog.silver_table(StagingTable::CrmSalesDetails);
    assert_eq!(table_rows(&store, &silver_sales).await.len(), 1);
    let facts = catalog.mart_table(MartTable::FactSales);
    assert!(!warehouse.written_tables().contains(&facts.name));

    let err = orchestrator.load_staging().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(orchestrator.stage(), Stage::Failed);
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_staging_write_fails_full_run() {
    init_test_tracing();

    let store = MemoryStore::new();
    let catalog = Catalog::default();
    BronzeFixture::new().seed(&store, &catalog).await.unwrap();
    let warehouse = TestStoreWrapper::wrap(store.clone());
    let products = catalog.silver_table(StagingTable::CrmPrdInfo);
    warehouse.fail_writes_to(products.name.clone());

    let err = orchestrator(&store, &warehouse)
        .run(RunMode::Full)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::StoreWriteFailed);
    let written = warehouse.written_tables();
    assert_eq!(
        written,
        vec![catalog.silver_table(StagingTable::CrmCustInfo).name]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn mart_run_without_silver_tables_fails() {
    init_test_tracing();

    let store = MemoryStore::new();
    let warehouse = TestStoreWrapper::wrap(store.clone());

    let mut orchestrator = orchestrator(&store, &warehouse);
    let err = orchestrator.load_dimensions().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MissingTable);
    assert_eq!(orchestrator.stage(), Stage::Failed);
}

#[tokio::test(flavor = "multi_thread")]
async fn facts_run_without_gold_tables_fails() {
    init_test_tracing();

    let store = MemoryStore::new();
    let warehouse = TestStoreWrapper::wrap(store.clone());

    let err = orchestrator(&store, &warehouse)
        .run(RunMode::Facts)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MissingTable);
}

#[tokio::test(flavor = "multi_thread")]
async fn facts_before_dimensions_fail_the_run() {
    init_test_tracing();

    let store = MemoryStore::new();
    let catalog = Catalog::default();
    BronzeFixture::new()
        .customer(Some(1), "AW1", "Alice", "Smith", None)
        .seed(&store, &catalog)
        .await
        .unwrap();
    let warehouse = TestStoreWrapper::wrap(store.clone());

    let mut loaded = orchestrator(&store, &warehouse);
    loaded.load_staging().await.unwrap();
    let (dimensions, _) = loaded.load_dimensions().await.unwrap();

    let mut fresh = orchestrator(&store, &warehouse);
    let err = fresh.load_facts(&dimensions).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(fresh.stage(), Stage::Failed);
    let facts = catalog.mart_table(MartTable::FactSales);
    assert!(!warehouse.written_tables().contains(&facts.name));
}

#[tokio::test(flavor = "multi_thread")]
async fn illegal_stage_entry_fails_the_run() {
    init_test_tracing();

    let store = MemoryStore::new();
    let catalog = Catalog::default();
    BronzeFixture::new().seed(&store, &catalog).await.unwrap();
    let warehouse = TestStoreWrapper::wrap(store.clone());

    let mut orchestrator = orchestrator(&store, &warehouse);
    orchestrator.load_staging().await.unwrap();
    orchestrator.load_dimensions().await.unwrap();
    assert_eq!(orchestrator.stage(), Stage::MartLoad);

    let err = orchestrator.load_staging().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(orchestrator.stage(), Stage::Failed);
}

#[tokio::test(flavor = "multi_thread")]
async fn completed_run_stays_done_after_a_rejected_stage() {
    init_test_tracing();

    let store = MemoryStore::new();
    let catalog = Catalog::default();
    BronzeFixture::new().seed(&store, &catalog).await.unwrap();
    let warehouse = TestStoreWrapper::wrap(store.clone());

    let mut orchestrator = orchestrator(&store, &warehouse);
    orchestrator.load_staging().await.unwrap();
    let (dimensions, _) = orchestrator.load_dimensions().await.unwrap();
    let (table, facts) = orchestrator.load_facts(&dimensions).await.unwrap();
    assert_eq!(table.table, facts.table);
    assert_eq!(orchestrator.stage(), Stage::MartDone);

    let err = orchestrator.load_facts(&dimensions).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(orchestrator.stage(), Stage::MartDone);
}
