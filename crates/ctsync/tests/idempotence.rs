use proptest::prelude::*;
use std::sync::Arc;

use ctsync::testing::FakeCatalog;
use ctsync::{ResourceSync, SyncOptions, TaxCategoryResource};
use ctsync_api::tax_category::{TaxCategoryDraft, TaxRateDraft};

fn draft_strategy() -> impl Strategy<Value = TaxCategoryDraft> {
    (
        "[a-z]{1,6}",
        prop::collection::btree_map(("[A-Z]{2}", prop::option::of("[a-z]{1,3}")), 0u32..30, 0..4),
    )
        .prop_map(|(name, rates)| {
            let mut draft = TaxCategoryDraft::new("", name);
            for ((country, state), amount) in rates {
                let rate = TaxRateDraft::new(country.clone(), f64::from(amount) / 100.0, country);
                draft = draft.with_rate(match state {
                    Some(state) => rate.with_state(state),
                    None => rate,
                });
            }
            draft
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn second_run_is_a_no_op(
        initial in prop::collection::vec(draft_strategy(), 0..8),
        target in prop::collection::vec(draft_strategy(), 1..8),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread().build()?;
        let keyed = |drafts: Vec<TaxCategoryDraft>| -> Vec<TaxCategoryDraft> {
            drafts
                .into_iter()
                .enumerate()
                .map(|(i, draft)| TaxCategoryDraft { key: Some(format!("tc-{i}")), ..draft })
                .collect()
        };
        let (initial, target) = (keyed(initial), keyed(target));

        let catalog = FakeCatalog::<TaxCategoryResource>::new();
        let sync = ResourceSync::new(
            Arc::new(catalog.clone()),
            Arc::new(catalog.clone()),
            SyncOptions::<TaxCategoryResource>::builder().batch_size(3).build(),
        );

        runtime.block_on(async {
            sync.sync(initial).await;
            let first = sync.sync(target.clone()).await;
            prop_assert_eq!(first.failed(), 0);
            prop_assert_eq!(first.processed(), target.len() as u64);

            let second = sync.sync(target.clone()).await;
            prop_assert_eq!(second.created(), 0);
            prop_assert_eq!(second.updated(), 0);
            prop_assert_eq!(second.failed(), 0);
            prop_assert_eq!(second.unchanged(), target.len() as u64);
            Ok(())
        })?;
    }
}
