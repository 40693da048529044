use askdb::{
    export, sample, CellValue, DatabaseTarget, LanguageModelGateway, Pipeline, PipelineOptions,
    PromptBuilder, PromptRequest, QueryExecutor, Result,
};
use async_trait::async_trait;
use std::sync::Arc;
use tempfile::tempdir;

struct Canned(&'static str);

#[async_trait]
impl LanguageModelGateway for Canned {
    async fn complete(&self, _request: &PromptRequest) -> Result<String> {
        Ok(self.0.to_string())
    }

    fn describe(&self) -> String {
        "canned".to_string()
    }
}

#[tokio::test]
async fn test_orders_per_status_on_sample_store() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.sqlite");
    assert!(sample::seed(&path).unwrap());

    let pipeline = Pipeline::new(
        DatabaseTarget::new(&path),
        PromptBuilder::default(),
        Arc::new(Canned(
            "<think>group orders by status</think>\n```sql\nSELECT status, COUNT(*) AS n FROM orders GROUP BY status ORDER BY status;\n```",
        )),
        PipelineOptions::default(),
    );

    let envelope = pipeline.ask("how many orders are in each status?").await;
    assert!(envelope.success, "{:?}", envelope.error);
    assert_eq!(envelope.columns(), ["status", "n"]);
    assert_eq!(
        envelope.rows(),
        [
            vec![CellValue::Text("Delivered".into()), CellValue::Integer(10)],
            vec![CellValue::Text("Pending".into()), CellValue::Integer(10)],
            vec![CellValue::Text("Shipped".into()), CellValue::Integer(10)],
        ]
    );

    let mut csv = Vec::new();
    export::to_csv(&envelope, &mut csv).unwrap();
    assert_eq!(
        String::from_utf8(csv).unwrap(),
        "status,n\nDelivered,10\nPending,10\nShipped,10\n"
    );
}

#[test]
fn test_prompt_lists_every_sample_table() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.sqlite");
    sample::seed(&path).unwrap();

    let schema = askdb::SchemaIntrospector::new(DatabaseTarget::new(&path))
        .introspect()
        .unwrap();
    let request = PromptBuilder::default()
        .build(&schema, "top customers by spend")
        .unwrap();

    for table in ["customers", "products", "orders", "order_items"] {
        assert!(request.schema.contains(&format!("\"{}\"", table)));
    }
    assert!(request
        .user_message()
        .ends_with("Question: top customers by spend\n\nSQL Query:"));
}

#[test]
fn test_read_only_target_rejects_writes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.sqlite");
    sample::seed(&path).unwrap();

    let executor = QueryExecutor::new(DatabaseTarget::new(&path).read_only(true));
    let envelope = executor.execute("DELETE FROM orders;");
    assert!(!envelope.success);
    assert_eq!(envelope.query.as_deref(), Some("DELETE FROM orders;"));

    let count = executor.execute("SELECT COUNT(*) FROM orders;");
    assert_eq!(count.rows()[0], vec![CellValue::Integer(30)]);
}
