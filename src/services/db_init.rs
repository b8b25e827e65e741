use mongodb::{
    bson::doc,
    options::IndexOptions,
    Database, IndexModel,
};

pub async fn ensure_indexes(db: &Database) -> Result<(), String> {
    // sectors: unique name
    {
        let col = db.collection::<mongodb::bson::Document>("sectors");
        let model = IndexModel::builder()
            .keys(doc! { "name": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        col.create_index(model, None)
            .await
            .map_err(|e| e.to_string())?;
    }

    // ipos: listed per user, newest first
    {
        let col = db.collection::<mongodb::bson::Document>("ipos");
        let model = IndexModel::builder()
            .keys(doc! { "user_id": 1, "created_at": -1 })
            .build();

        col.create_index(model, None)
            .await
            .map_err(|e| e.to_string())?;
    }

    // ipos: the alert batch scans portfolio holdings across all users
    {
        let col = db.collection::<mongodb::bson::Document>("ipos");
        let model = IndexModel::builder()
            .keys(doc! { "portfolio": 1 })
            .build();

        col.create_index(model, None)
            .await
            .map_err(|e| e.to_string())?;
    }

    // alert_rules: per-user lookups by type, and at most one base rule per user
    {
        let col = db.collection::<mongodb::bson::Document>("alert_rules");
        for model in alert_rule_indexes() {
            col.create_index(model, None)
                .await
                .map_err(|e| e.to_string())?;
        }
    }

    Ok(())
}

pub fn alert_rule_indexes() -> Vec<IndexModel> {
    let lookup = IndexModel::builder()
        .keys(doc! { "user_id": 1, "type": 1, "created_at": 1 })
        .build();

    // two base rules for one user would fail every alert batch
    let one_base = IndexModel::builder()
        .keys(doc! { "user_id": 1, "type": 1 })
        .options(
            IndexOptions::builder()
                .name("one_base_rule_per_user".to_string())
                .unique(true)
                .partial_filter_expression(doc! { "type": "base" })
                .build(),
        )
        .build();

    vec![lookup, one_base]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_rules_are_unique_per_user() {
        let indexes = alert_rule_indexes();
        let base = indexes
            .iter()
            .find(|m| m.keys == doc! { "user_id": 1, "type": 1 })
            .unwrap();
        let opts = base.options.as_ref().unwrap();

        assert_eq!(opts.unique, Some(true));
        assert_eq!(opts.partial_filter_expression, Some(doc! { "type": "base" }));
    }

    #[test]
    fn rule_lookup_index_is_not_unique() {
        let indexes = alert_rule_indexes();
        let lookup = indexes
            .iter()
            .find(|m| m.keys.contains_key("created_at"))
            .unwrap();

        assert!(lookup.options.as_ref().and_then(|o| o.unique).is_none());
    }
}
