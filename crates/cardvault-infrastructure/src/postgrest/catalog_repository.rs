//! PostgREST-backed implementation of CatalogRepository.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use cardvault_core::catalog::{
    CatalogChanges, CatalogFilter, CatalogItem, CatalogRepository, Category, ItemKind, LookupId,
    NewCatalogRecord, Page, PageRequest,
};
use cardvault_core::error::{CardvaultError, Result};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::query::{Direction, Filter, SelectQuery};
use super::rows::{
    CATEGORIES, FEATURED_PRODUCTS, FeaturedRow, IdRow, ImageRow, LookupRow, NewProductRow,
    PRODUCT_COLUMNS, PRODUCT_IMAGES, PRODUCT_TYPES, PRODUCTS, ProductRow, category_slug,
    kind_slug, update_body,
};
use super::transport::PostgrestTransport;

/// A catalog repository over a PostgREST transport.
///
/// A page of `n` entries always costs three selects: the products, then their
/// images and featured rows fetched concurrently with one `in.(...)` each.
#[derive(Debug, Clone)]
pub struct PostgrestCatalogRepository<T: PostgrestTransport> {
    transport: T,
}

impl<T: PostgrestTransport> PostgrestCatalogRepository<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn product_query(inner_category: bool, inner_kind: bool) -> SelectQuery {
        let category = if inner_category { "categories!inner(slug)" } else { "categories(slug)" };
        let kind = if inner_kind { "product_types!inner(slug)" } else { "product_types(slug)" };
        SelectQuery::new(PRODUCTS).select(format!("{},{},{}", PRODUCT_COLUMNS, category, kind))
    }

    /// Attaches images and featured flags to a page of rows.
    async fn hydrate(&self, rows: Vec<ProductRow>) -> Result<Vec<CatalogItem>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<&str> = rows.iter().map(|row| row.id.as_str()).collect();

        let images_query = SelectQuery::new(PRODUCT_IMAGES)
            .select("product_id,url,position")
            .filter(Filter::in_list("product_id", ids.iter()))
            .order("product_id", Direction::Asc)
            .order("position", Direction::Asc);
        let featured_query = SelectQuery::new(FEATURED_PRODUCTS)
            .select("product_id")
            .filter(Filter::in_list("product_id", ids.iter()));

        let (image_rows, featured_rows) = futures::try_join!(
            self.transport.select(&images_query),
            self.transport.select(&featured_query),
        )?;

        let mut images: HashMap<String, Vec<ImageRow>> = HashMap::new();
        for row in parse_rows::<ImageRow>(image_rows.rows)? {
            images.entry(row.product_id.clone()).or_default().push(row);
        }
        let featured: HashSet<String> = parse_rows::<FeaturedRow>(featured_rows.rows)?
            .into_iter()
            .map(|row| row.product_id)
            .collect();

        Ok(rows
            .into_iter()
            .map(|row| {
                let mut item_images = images.remove(&row.id).unwrap_or_default();
                item_images.sort_by_key(|image| image.position);
                let urls = item_images.into_iter().map(|image| image.url).collect();
                let is_featured = featured.contains(&row.id);
                row.into_item(urls, is_featured)
            })
            .collect())
    }

    async fn resolve_lookup(&self, table: &str, entity: &'static str, slug: &str) -> Result<LookupId> {
        let query = SelectQuery::new(table)
            .select("id")
            .filter(Filter::eq("slug", slug))
            .limit(1);
        let rows = self.transport.select(&query).await?;
        parse_rows::<LookupRow>(rows.rows)?
            .into_iter()
            .next()
            .map(|row| row.id)
            .ok_or_else(|| CardvaultError::not_found(entity, slug))
    }

    /// Patches one product row; a row that is missing or hidden is `NotFound`.
    async fn update_product(&self, id: &str, body: Value) -> Result<()> {
        let matched = self
            .transport
            .update(PRODUCTS, &[Filter::eq("id", id)], body)
            .await?;
        if matched == 0 {
            tracing::debug!(%id, "Update matched no catalog entry");
            return Err(CardvaultError::not_found("catalog item", id));
        }
        Ok(())
    }
}

#[async_trait]
impl<T: PostgrestTransport> CatalogRepository for PostgrestCatalogRepository<T> {
    async fn list(&self, page: PageRequest, filter: &CatalogFilter) -> Result<Page<CatalogItem>> {
        let mut query = Self::product_query(filter.category.is_some(), filter.kind.is_some());
        if let Some(category) = filter.category {
            query = query.filter(Filter::eq("categories.slug", category_slug(category)));
        }
        if let Some(kind) = filter.kind {
            query = query.filter(Filter::eq("product_types.slug", kind_slug(kind)));
        }
        if let Some(status) = filter.status {
            query = query.filter(Filter::eq("status", status));
        }
        if let Some(text) = filter.search_text() {
            query = query.filter(Filter::contains_text("name", text));
        }
        let query = query
            .order("created_at", Direction::Desc)
            .limit(page.page_size())
            .offset(page.offset())
            .count_exact();

        let result = self.transport.select(&query).await?;
        let total = result.total;
        let rows = parse_rows::<ProductRow>(result.rows)?;
        let fetched = rows.len();
        let items = self.hydrate(rows).await?;

        let total_count = total.unwrap_or(page.offset().saturating_add(fetched));
        tracing::debug!(page = page.page(), fetched, total_count, "Listed catalog page");
        Ok(Page::new(items, total_count, page))
    }

    async fn list_featured(&self, limit: usize) -> Result<Vec<CatalogItem>> {
        let featured_query = SelectQuery::new(FEATURED_PRODUCTS)
            .select("product_id")
            .order("created_at", Direction::Desc)
            .limit(limit);
        let featured = parse_rows::<FeaturedRow>(self.transport.select(&featured_query).await?.rows)?;
        if featured.is_empty() {
            return Ok(Vec::new());
        }

        let query = Self::product_query(false, false).filter(Filter::in_list(
            "id",
            featured.iter().map(|row| row.product_id.as_str()),
        ));
        let rows = parse_rows::<ProductRow>(self.transport.select(&query).await?.rows)?;
        let mut items: HashMap<String, CatalogItem> = self
            .hydrate(rows)
            .await?
            .into_iter()
            .map(|item| (item.id.clone(), item))
            .collect();

        Ok(featured
            .into_iter()
            .filter_map(|row| items.remove(&row.product_id))
            .collect())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<CatalogItem>> {
        let query = Self::product_query(false, false)
            .filter(Filter::eq("id", id))
            .limit(1);
        let rows = parse_rows::<ProductRow>(self.transport.select(&query).await?.rows)?;
        Ok(self.hydrate(rows).await?.into_iter().next())
    }

    async fn resolve_category_id(&self, category: Category) -> Result<LookupId> {
        self.resolve_lookup(CATEGORIES, "category", category_slug(category))
            .await
    }

    async fn resolve_kind_id(&self, kind: ItemKind) -> Result<LookupId> {
        self.resolve_lookup(PRODUCT_TYPES, "product type", &kind_slug(kind))
            .await
    }

    async fn insert_item(&self, record: &NewCatalogRecord) -> Result<String> {
        let row = NewProductRow::from_record(record)?;
        let stored = self
            .transport
            .insert(PRODUCTS, serde_json::to_value(&row)?)
            .await?;
        let id = parse_rows::<IdRow>(stored)?
            .into_iter()
            .next()
            .map(|row| row.id)
            .ok_or_else(|| CardvaultError::internal("Insert returned no product row"))?;

        tracing::info!(%id, slug = %record.slug, "Inserted catalog entry");
        Ok(id)
    }

    async fn update_item(&self, id: &str, changes: &CatalogChanges) -> Result<()> {
        let body = update_body(changes, Utc::now())?;
        self.update_product(id, body).await
    }

    async fn touch_item(&self, id: &str) -> Result<()> {
        let body = json!({ "updated_at": Utc::now().to_rfc3339() });
        self.update_product(id, body).await
    }

    async fn delete_item(&self, id: &str) -> Result<()> {
        self.transport
            .delete(PRODUCTS, &[Filter::eq("id", id)])
            .await
    }

    async fn insert_images(&self, id: &str, images: &[String]) -> Result<()> {
        if images.is_empty() {
            return Ok(());
        }
        let rows: Vec<ImageRow> = images
            .iter()
            .enumerate()
            .map(|(position, url)| ImageRow {
                product_id: id.to_string(),
                url: url.trim().to_string(),
                position: position as i32,
            })
            .collect();
        self.transport
            .insert(PRODUCT_IMAGES, serde_json::to_value(&rows)?)
            .await?;
        Ok(())
    }

    async fn delete_images(&self, id: &str) -> Result<()> {
        self.transport
            .delete(PRODUCT_IMAGES, &[Filter::eq("product_id", id)])
            .await
    }

    async fn set_featured(&self, id: &str, featured: bool) -> Result<()> {
        if featured {
            self.transport
                .insert_ignore_duplicates(
                    FEATURED_PRODUCTS,
                    json!({ "product_id": id }),
                    "product_id",
                )
                .await
        } else {
            self.transport
                .delete(FEATURED_PRODUCTS, &[Filter::eq("product_id", id)])
                .await
        }
    }
}

fn parse_rows<R: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<R>> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(CardvaultError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::postgrest::transport::Rows;
    use cardvault_core::catalog::{Condition, ItemStatus, Language, Patch};
    use rust_decimal_macros::dec;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Select(SelectQuery),
        Insert(String, Value),
        Upsert(String, Value),
        Update(String, Vec<Filter>, Value),
        Delete(String, Vec<Filter>),
    }

    // Fake transport answering selects from canned per-table rows
    #[derive(Clone, Default)]
    struct RecordingTransport {
        tables: Arc<Mutex<HashMap<String, Vec<Value>>>>,
        calls: Arc<Mutex<Vec<Call>>>,
        total: Option<usize>,
        no_matching_rows: bool,
    }

    impl RecordingTransport {
        fn with_table(self, table: &str, rows: Vec<Value>) -> Self {
            self.tables.lock().unwrap().insert(table.to_string(), rows);
            self
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn selects_on(&self, table: &str) -> usize {
            self.calls()
                .iter()
                .filter(|c| matches!(c, Call::Select(q) if q.table == table))
                .count()
        }
    }

    #[async_trait]
    impl PostgrestTransport for RecordingTransport {
        async fn select(&self, query: &SelectQuery) -> Result<Rows> {
            self.calls.lock().unwrap().push(Call::Select(query.clone()));
            let rows = self
                .tables
                .lock()
                .unwrap()
                .get(&query.table)
                .cloned()
                .unwrap_or_default();
            Ok(Rows {
                rows,
                total: if query.count_exact { self.total } else { None },
            })
        }

        async fn insert(&self, table: &str, rows: Value) -> Result<Vec<Value>> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Insert(table.to_string(), rows));
            Ok(vec![json!({ "id": "new-id" })])
        }

        async fn insert_ignore_duplicates(
            &self,
            table: &str,
            rows: Value,
            _on_conflict: &str,
        ) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Upsert(table.to_string(), rows));
            Ok(())
        }

        async fn update(&self, table: &str, filters: &[Filter], body: Value) -> Result<usize> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Update(table.to_string(), filters.to_vec(), body));
            Ok(if self.no_matching_rows { 0 } else { 1 })
        }

        async fn delete(&self, table: &str, filters: &[Filter]) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Delete(table.to_string(), filters.to_vec()));
            Ok(())
        }
    }

    fn product(id: &str, category: &str) -> Value {
        json!({
            "id": id,
            "name": format!("Card {id}"),
            "slug": format!("card-{id}"),
            "category_id": 1,
            "type_id": 1,
            "set_name": "Base Set",
            "code": "1/102",
            "language": "pt",
            "condition": "NM",
            "price_cents": 1250,
            "status": "available",
            "description": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z",
            "categories": { "slug": category },
            "product_types": { "slug": "raw" }
        })
    }

    fn listing_transport() -> RecordingTransport {
        RecordingTransport {
            total: Some(26),
            ..Default::default()
        }
        .with_table(
            PRODUCTS,
            (0..12).map(|i| product(&format!("p{i}"), "pokemon")).collect(),
        )
        .with_table(
            PRODUCT_IMAGES,
            vec![
                json!({ "product_id": "p1", "url": "second.webp", "position": 1 }),
                json!({ "product_id": "p1", "url": "first.webp", "position": 0 }),
            ],
        )
        .with_table(FEATURED_PRODUCTS, vec![json!({ "product_id": "p3" })])
    }

    #[tokio::test]
    async fn test_list_batches_dependent_lookups() {
        let transport = listing_transport();
        let repo = PostgrestCatalogRepository::new(transport.clone());

        let page = repo
            .list(PageRequest::new(2, 12), &CatalogFilter::default())
            .await
            .unwrap();

        assert_eq!(page.items.len(), 12);
        assert_eq!(page.total_count, 26);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_previous && page.has_next);

        assert_eq!(transport.calls().len(), 3);
        assert_eq!(transport.selects_on(PRODUCT_IMAGES), 1);
        assert_eq!(transport.selects_on(FEATURED_PRODUCTS), 1);

        assert_eq!(page.items[1].images, vec!["first.webp", "second.webp"]);
        assert!(page.items[3].is_featured());
        assert!(!page.items[0].is_featured());
        assert_eq!(page.items[0].price, dec!(12.50));
    }

    #[tokio::test]
    async fn test_list_applies_filters() {
        let transport = listing_transport();
        let repo = PostgrestCatalogRepository::new(transport.clone());
        let filter = CatalogFilter {
            category: Some(Category::YuGiOh),
            status: Some(ItemStatus::Available),
            search: Some(" dragon ".to_string()),
            ..Default::default()
        };

        repo.list(PageRequest::new(1, 12), &filter).await.unwrap();

        let Call::Select(query) = &transport.calls()[0] else {
            panic!("expected a select first");
        };
        assert!(query.columns.contains("categories!inner(slug)"));
        assert!(query.filters.contains(&Filter::eq("categories.slug", "yu-gi-oh")));
        assert!(query.filters.contains(&Filter::eq("status", "available")));
        assert!(query.filters.contains(&Filter::ILike("name".into(), "dragon".into())));
        assert!(query.count_exact);
        assert_eq!(query.offset, Some(0));
    }

    #[tokio::test]
    async fn test_empty_page_skips_dependent_lookups() {
        let transport = RecordingTransport::default();
        let repo = PostgrestCatalogRepository::new(transport.clone());

        let page = repo
            .list(PageRequest::default(), &CatalogFilter::default())
            .await
            .unwrap();

        assert!(page.items.is_empty());
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_find_by_id_missing_is_none() {
        let repo = PostgrestCatalogRepository::new(RecordingTransport::default());
        assert!(repo.find_by_id("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resolve_missing_lookup_is_not_found() {
        let repo = PostgrestCatalogRepository::new(RecordingTransport::default());
        let err = repo.resolve_category_id(Category::Magic).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_insert_item_and_images() {
        let transport = RecordingTransport::default();
        let repo = PostgrestCatalogRepository::new(transport.clone());
        let record = NewCatalogRecord {
            name: " Umbreon VMAX ".to_string(),
            slug: "umbreon-vmax-215-203".to_string(),
            category_id: 1,
            kind_id: 2,
            set_name: "Evolving Skies".to_string(),
            code: "215/203".to_string(),
            language: Language::Jp,
            condition: Condition::Mint,
            price: dec!(899.995),
            status: ItemStatus::Available,
            description: None,
        };

        assert_eq!(repo.insert_item(&record).await.unwrap(), "new-id");
        repo.insert_images("new-id", &["a.png".to_string(), "b.png".to_string()])
            .await
            .unwrap();

        let calls = transport.calls();
        let Call::Insert(table, body) = &calls[0] else {
            panic!("expected product insert");
        };
        assert_eq!(table, PRODUCTS);
        assert_eq!(body["name"], json!("Umbreon VMAX"));
        assert_eq!(body["price_cents"], json!(90000));
        assert_eq!(body["type_id"], json!(2));
        assert!(body.get("description").is_none());

        let Call::Insert(table, body) = &calls[1] else {
            panic!("expected image insert");
        };
        assert_eq!(table, PRODUCT_IMAGES);
        assert_eq!(body[1]["position"], json!(1));
        assert_eq!(body[1]["url"], json!("b.png"));
    }

    #[tokio::test]
    async fn test_update_item_sends_only_provided_fields() {
        let transport = RecordingTransport::default();
        let repo = PostgrestCatalogRepository::new(transport.clone());
        let changes = CatalogChanges {
            status: Patch::Set(ItemStatus::Sold),
            ..Default::default()
        };

        repo.update_item("p1", &changes).await.unwrap();

        let Call::Update(table, filters, body) = &transport.calls()[0] else {
            panic!("expected update");
        };
        assert_eq!(table, PRODUCTS);
        assert_eq!(filters, &vec![Filter::eq("id", "p1")]);
        let keys: Vec<&String> = body.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 2);
        assert_eq!(body["status"], json!("sold"));
        assert!(body["updated_at"].is_string());
    }

    #[tokio::test]
    async fn test_update_of_missing_row_is_not_found() {
        let transport = RecordingTransport {
            no_matching_rows: true,
            ..Default::default()
        };
        let repo = PostgrestCatalogRepository::new(transport.clone());

        let err = repo.touch_item("ghost").await.unwrap_err();
        assert!(err.is_not_found());
        let err = repo
            .update_item("ghost", &CatalogChanges {
                status: Patch::Set(ItemStatus::Sold),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(transport.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_set_featured_toggles_membership_row() {
        let transport = RecordingTransport::default();
        let repo = PostgrestCatalogRepository::new(transport.clone());

        repo.set_featured("p1", true).await.unwrap();
        repo.set_featured("p1", false).await.unwrap();

        let calls = transport.calls();
        assert_eq!(
            calls[0],
            Call::Upsert(FEATURED_PRODUCTS.to_string(), json!({ "product_id": "p1" }))
        );
        assert_eq!(
            calls[1],
            Call::Delete(
                FEATURED_PRODUCTS.to_string(),
                vec![Filter::eq("product_id", "p1")]
            )
        );
    }

    #[tokio::test]
    async fn test_list_featured_keeps_featured_order() {
        let transport = RecordingTransport::default()
            .with_table(
                FEATURED_PRODUCTS,
                vec![json!({ "product_id": "b" }), json!({ "product_id": "a" })],
            )
            .with_table(PRODUCTS, vec![product("a", "other"), product("b", "magic-the-gathering")]);
        let repo = PostgrestCatalogRepository::new(transport);

        let items = repo.list_featured(4).await.unwrap();
        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(items[0].category, Category::Magic);
        assert!(items.iter().all(CatalogItem::is_featured));
    }
}
