//! Article-to-SKU resolution (SPEC_FULL.md §4.4 "SKU resolution").

use std::collections::HashMap;

use crate::domain::Item;
use crate::error::{Error, Result};
use crate::ports::{Credentials, MarketplaceClient};

/// Resolve every item's SKU in place. Articles that already parse as a
/// positive integer are used directly; the rest are resolved through the
/// marketplace in batches of `batch_size`. Any article the marketplace can't
/// resolve is a fatal input error - no draft is created for a task with
/// unresolved SKUs.
pub async fn resolve_items(
    client: &dyn MarketplaceClient,
    credentials: &Credentials,
    items: &mut [Item],
    batch_size: usize,
) -> Result<()> {
    let mut to_resolve: Vec<String> = Vec::new();
    for item in items.iter_mut() {
        if let Ok(sku) = item.article.parse::<u64>() {
            if sku > 0 {
                item.sku = Some(sku);
                continue;
            }
        }
        if !item.sku.is_some_and(|sku| sku > 0) {
            to_resolve.push(item.article.clone());
        }
    }
    to_resolve.sort_unstable();
    to_resolve.dedup();

    if to_resolve.is_empty() {
        return Ok(());
    }

    let mut resolved: HashMap<String, u64> = HashMap::new();
    for batch in to_resolve.chunks(batch_size.max(1)) {
        let results = client.resolve_offers_to_skus(credentials, batch).await?;
        for result in results {
            if let Some(sku) = result.sku {
                resolved.insert(result.article, sku);
            }
        }
    }

    for item in items.iter_mut() {
        if item.sku.is_some_and(|sku| sku > 0) {
            continue;
        }
        match resolved.get(&item.article) {
            Some(&sku) => item.sku = Some(sku),
            None => {
                return Err(Error::Input(format!(
                    "article {:?} could not be resolved to a sku",
                    item.article
                )))
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::ScriptedMarketplaceClient;
    use crate::ports::SkuResolution;

    fn credentials() -> Credentials {
        Credentials {
            client_id: "c1".to_string(),
            api_key: "k1".to_string(),
        }
    }

    #[tokio::test]
    async fn numeric_article_is_used_directly() {
        let client = ScriptedMarketplaceClient::new();
        let mut items = vec![Item::new("123", None, 1).unwrap()];
        resolve_items(&client, &credentials(), &mut items, 100).await.unwrap();
        assert_eq!(items[0].sku, Some(123));
    }

    #[tokio::test]
    async fn non_numeric_article_is_resolved_through_the_marketplace() {
        let client = ScriptedMarketplaceClient::new();
        client.push_sku_resolution(vec![SkuResolution {
            article: "widget-a".to_string(),
            sku: Some(555),
        }]);
        let mut items = vec![Item::new("widget-a", None, 1).unwrap()];
        resolve_items(&client, &credentials(), &mut items, 100).await.unwrap();
        assert_eq!(items[0].sku, Some(555));
    }

    #[tokio::test]
    async fn zero_sku_is_treated_as_unresolved() {
        let client = ScriptedMarketplaceClient::new();
        client.push_sku_resolution(vec![SkuResolution {
            article: "widget-a".to_string(),
            sku: Some(555),
        }]);
        let mut items = vec![Item {
            article: "widget-a".to_string(),
            sku: Some(0),
            quantity: 1,
        }];
        resolve_items(&client, &credentials(), &mut items, 100).await.unwrap();
        assert_eq!(items[0].sku, Some(555));
    }

    #[tokio::test]
    async fn unresolved_article_is_a_fatal_input_error() {
        let client = ScriptedMarketplaceClient::new();
        client.push_sku_resolution(vec![SkuResolution {
            article: "widget-a".to_string(),
            sku: None,
        }]);
        let mut items = vec![Item::new("widget-a", None, 1).unwrap()];
        let result = resolve_items(&client, &credentials(), &mut items, 100).await;
        assert!(matches!(result, Err(Error::Input(_))));
    }

    #[tokio::test]
    async fn articles_are_batched_by_batch_size() {
        let client = ScriptedMarketplaceClient::new();
        client.push_sku_resolution(vec![SkuResolution {
            article: "a".to_string(),
            sku: Some(1),
        }]);
        client.push_sku_resolution(vec![SkuResolution {
            article: "b".to_string(),
            sku: Some(2),
        }]);
        let mut items = vec![
            Item::new("a", None, 1).unwrap(),
            Item::new("b", None, 1).unwrap(),
        ];
        resolve_items(&client, &credentials(), &mut items, 1).await.unwrap();
        assert_eq!(items[0].sku, Some(1));
        assert_eq!(items[1].sku, Some(2));
    }
}
