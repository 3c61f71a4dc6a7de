use chrono::NaiveDate;
use dwh::catalog::Catalog;
use dwh::mart::MartTable;
use dwh::mart::sales::CUSTOMER_ROLE;
use dwh::orchestrator::{RunMode, Stage, StageOrchestrator};
use dwh::staging::StagingTable;
use dwh::store::memory::MemoryStore;
use dwh::test_utils::fixture::{BronzeFixture, column_values, table_rows};
use dwh::test_utils::test_store_wrapper::TestStoreWrapper;
use dwh::types::{Cell, NaturalKey};
use dwh_config::shared::{LayerConfig, LoadConfig};
use dwh_telemetry::tracing::init_test_tracing;

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn today() -> NaiveDate {
    date(2025, 6, 1)
}

/// Two customers, one product and two order lines, the second for an unknown customer.
fn small_fixture() -> BronzeFixture {
    BronzeFixture::new()
        .customer(Some(1), "AW1", "Alice", "Smith", Some(date(2024, 1, 1)))
        .customer(Some(2), "AW2", "Bob", "Jones", Some(date(2024, 1, 2)))
        .erp_customer("NASAW1", Some(date(1990, 5, 17)), "F")
        .location("AW-1", "DE")
        .product(10, "CO-RF-P1", "Frame", Some(100), "R", date(2024, 1, 1))
        .category("CO_RF", "Components", "Road Frames", "Yes")
        .sale("SO1", "P1", 1, 20240105, 2, 100)
        .sale("SO2", "P1", 3, 20240106, 1, 100)
}

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
    .with_today(today())
}

#[tokio::test(flavor = "multi_thread")]
async fn full_run_builds_star_schema() {
    init_test_tracing();

    let store = MemoryStore::new();
    let catalog = Catalog::default();
    small_fixture().seed(&store, &catalog).await.unwrap();
    let warehouse = TestStoreWrapper::wrap(store.clone());

    let report = orchestrator(&store, &warehouse)
        .run(RunMode::Full)
        .await
        .unwrap();

    assert_eq!(report.stage, Stage::MartDone);
    assert_eq!(report.tables.len(), StagingTable::ALL.len() + 3);
    let sales = catalog.mart_table(MartTable::FactSales);
    let sales_report = report.table(&sales.name).unwrap();
    assert_eq!(sales_report.rows_read, 2);
    assert_eq!(sales_report.rows_written, 1);

    let customers = catalog.mart_table(MartTable::DimCustomers);
    assert_eq!(
        column_values(&store, &customers, "customer_key").await,
        vec![Cell::I64(1), Cell::I64(2)]
    );
    assert_eq!(
        column_values(&store, &customers, "country").await,
        vec![Cell::from("Germany"), Cell::from("n/a")]
    );
    assert_eq!(
        column_values(&store, &customers, "gender").await,
        vec![Cell::from("Female"), Cell::from("Female")]
    );
    assert_eq!(
        column_values(&store, &customers, "birthdate").await,
        vec![Cell::from(date(1990, 5, 17)), Cell::Null]
    );

    let products = catalog.mart_table(MartTable::DimProducts);
    assert_eq!(
        column_values(&store, &products, "product_number").await,
        vec![Cell::from("P1")]
    );
    assert_eq!(
        column_values(&store, &products, "subcategory").await,
        vec![Cell::from("Road Frames")]
    );

    let rows = table_rows(&store, &sales).await;
    assert_eq!(rows.len(), 1);
    let row = rows[0].values();
    assert_eq!(row[1], Cell::from("SO1"));
    assert_eq!(row[2], Cell::I64(1));
    assert_eq!(row[3], Cell::I64(1));
    assert_eq!(row[4], Cell::from(date(2024, 1, 5)));
    assert_eq!(row[7].as_i64(), Some(200));

    let facts = report.facts.unwrap();
    assert_eq!(facts.accepted, 1);
    assert_eq!(facts.skipped, 1);
    let missing = facts.missing(CUSTOMER_ROLE).unwrap();
    assert_eq!(missing.occurrences(), 1);
    assert_eq!(missing.keys(), &[NaturalKey::single(3i32)]);
}

#[tokio::test(flavor = "multi_thread")]
async fn staging_keeps_latest_customer_record() {
    init_test_tracing();

    let store = MemoryStore::new();
    let catalog = Catalog::default();
    BronzeFixture::new()
        .customer(Some(1), "AW1", " Alice ", "Smith", Some(date(2024, 1, 1)))
        .customer(Some(1), "AW1", "Alicia", "Smith", Some(date(2024, 3, 1)))
        .customer(Some(1), "AW1", "Alison", "Smith", None)
        .customer(None, "AW9", "Nobody", "Known", Some(date(2024, 1, 1)))
        .customer(Some(2), "AW2", "Bob", "Jones", Some(date(2024, 1, 2)))
        .seed(&store, &catalog)
        .await
        .unwrap();
    let warehouse = TestStoreWrapper::wrap(store.clone());

    let report = orchestrator(&store, &warehouse)
        .run(RunMode::Table(StagingTable::CrmCustInfo))
        .await
        .unwrap();

    assert_eq!(report.stage, Stage::StagingDone);
    let silver = catalog.silver_table(StagingTable::CrmCustInfo);
    assert_eq!(
        column_values(&store, &silver, "cst_firstname").await,
        vec![Cell::from("Alicia"), Cell::from("Bob")]
    );
    assert_eq!(
        column_values(&store, &silver, "cst_marital_status").await,
        vec![Cell::from("Single"), Cell::from("Single")]
    );

    let table = report.table(&silver.name).unwrap();
    assert_eq!(table.rows_written, 2);
    assert!(report.facts.is_none());
    assert_eq!(warehouse.written_tables(), vec![silver.name.clone()]);
}

#[tokio::test(flavor = "multi_thread")]
async fn surrogate_keys_follow_natural_key_order() {
    init_test_tracing();

    let store = MemoryStore::new();
    let catalog = Catalog::default();
    BronzeFixture::new()
        .customer(Some(9), "AW9", "Ivy", "Moss", Some(date(2024, 1, 1)))
        .customer(Some(3), "AW3", "Carl", "Ray", Some(date(2024, 1, 1)))
        .customer(Some(5), "AW5", "Eve", "Lind", Some(date(2024, 1, 1)))
        .seed(&store, &catalog)
        .await
        .unwrap();
    let warehouse = TestStoreWrapper::wrap(store.clone());

    orchestrator(&store, &warehouse)
        .run(RunMode::Full)
        .await
        .unwrap();

    let customers = catalog.mart_table(MartTable::DimCustomers);
    let pairs = table_rows(&store, &customers)
        .await
        .into_iter()
        .map(|row| (row.values()[0].clone(), row.values()[1].clone()))
        .collect::<Vec<_>>();
    assert_eq!(
        pairs,
        vec![
            (Cell::I64(1), Cell::I32(3)),
            (Cell::I64(2), Cell::I32(5)),
            (Cell::I64(3), Cell::I32(9)),
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn facts_run_reuses_gold_dimensions() {
    init_test_tracing();

    let store = MemoryStore::new();
    let catalog = Catalog::default();
    small_fixture().seed(&store, &catalog).await.unwrap();
    let warehouse = TestStoreWrapper::wrap(store.clone());

    orchestrator(&store, &warehouse)
        .run(RunMode::Full)
        .await
        .unwrap();
    let customers = catalog.mart_table(MartTable::DimCustomers);
    let customers_before = table_rows(&store, &customers).await;

    let warehouse = TestStoreWrapper::wrap(store.clone());
    let report = orchestrator(&store, &warehouse)
        .run(RunMode::Facts)
        .await
        .unwrap();

    assert_eq!(report.stage, Stage::MartDone);
    let sales = catalog.mart_table(MartTable::FactSales);
    assert_eq!(report.tables.len(), 1);
    assert_eq!(report.tables[0].table, sales.name);
    assert_eq!(report.facts.unwrap().accepted, 1);

    assert_eq!(warehouse.truncations(), vec![vec![sales.name.clone()]]);
    assert_eq!(warehouse.written_tables(), vec![sales.name.clone()]);
    assert_eq!(table_rows(&store, &sales).await.len(), 1);
    assert_eq!(table_rows(&store, &customers).await, customers_before);
}

#[tokio::test(flavor = "multi_thread")]
async fn mart_run_truncates_fact_table_first() {
    init_test_tracing();

    let store = MemoryStore::new();
    let catalog = Catalog::default();
    small_fixture().seed(&store, &catalog).await.unwrap();

    let warehouse = TestStoreWrapper::wrap(store.clone());
    orchestrator(&store, &warehouse)
        .run(RunMode::Full)
        .await
        .unwrap();

    let warehouse = TestStoreWrapper::wrap(store.clone());
    let report = orchestrator(&store, &warehouse)
        .run(RunMode::Mart)
        .await
        .unwrap();

    assert_eq!(report.stage, Stage::MartDone);
    let gold = MartTable::ALL
        .into_iter()
        .map(|table| catalog.mart_table(table).name)
        .collect::<Vec<_>>();
    assert_eq!(warehouse.truncations(), vec![gold]);

    let customers = catalog.mart_table(MartTable::DimCustomers);
    assert_eq!(
        column_values(&store, &customers, "customer_key").await,
        vec![Cell::I64(1), Cell::I64(2)]
    );
}
