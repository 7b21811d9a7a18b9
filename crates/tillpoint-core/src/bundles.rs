use tillpoint_domain::{from_cents, to_cents, Bundle, BundleMember, Product, Variant};

use crate::error::AppError;
use crate::repo::Repository;

/// Which kind of entity was deleted, selecting the membership entries to
/// strip: product-level entries for a product deletion, variant-level
/// entries for a variant deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletedRef {
    Product,
    Variant,
}

/// Outcome of a repair pass. Failures are per-bundle; a failed bundle is
/// left untouched in the store.
#[derive(Debug, Default)]
pub struct RepairReport {
    pub repaired: Vec<String>,
    pub failed: Vec<String>,
}

/// Re-derives dependent bundle state after a product or variant deletion.
///
/// Repair is part of the deletion contract: the catalog invokes it for every
/// bundle referencing the deleted entity before the delete operation
/// returns. Bundles are processed independently; within one bundle all
/// member re-reads complete before its single persisted update.
///
/// The member re-reads are not transactional with the bundle write — a
/// concurrent price update between read and write can leave a stale derived
/// price. Known limitation, inherited from the original system.
pub struct BundleMaintainer<'a> {
    products: &'a Repository<Product>,
    variants: &'a Repository<Variant>,
    bundles: &'a Repository<Bundle>,
}

impl<'a> BundleMaintainer<'a> {
    pub fn new(
        products: &'a Repository<Product>,
        variants: &'a Repository<Variant>,
        bundles: &'a Repository<Bundle>,
    ) -> Self {
        Self {
            products,
            variants,
            bundles,
        }
    }

    /// Repair every given bundle after `deleted_id` was removed.
    ///
    /// A failing bundle is reported and skipped, never aborting the batch.
    pub fn repair_after_delete(
        &self,
        deleted_id: &str,
        bundles: &[Bundle],
        kind: DeletedRef,
    ) -> RepairReport {
        let mut report = RepairReport::default();
        for bundle in bundles {
            match self.repair_bundle(deleted_id, bundle, kind) {
                Ok(()) => report.repaired.push(bundle.id.clone()),
                Err(err) => {
                    tracing::warn!(bundle = %bundle.id, error = %err, "bundle repair failed");
                    report.failed.push(bundle.id.clone());
                }
            }
        }
        report
    }

    fn repair_bundle(
        &self,
        deleted_id: &str,
        bundle: &Bundle,
        kind: DeletedRef,
    ) -> Result<(), AppError> {
        let survivors: Vec<BundleMember> = bundle
            .products
            .iter()
            .filter(|m| !matches_deleted(m, deleted_id, kind))
            .cloned()
            .collect();

        // All member re-reads complete before the bundle update is persisted.
        let mut active = false;
        let mut price_cents: i64 = 0;
        for member in &survivors {
            let (member_active, member_price) = if member.is_variant() {
                let variant = self.variants.require(&member.id)?;
                (variant.active, variant.price)
            } else {
                let product = self.products.require(&member.id)?;
                (product.active, product.price)
            };
            active = active || member_active;
            if bundle.auto_price {
                price_cents += to_cents(&member_price).ok_or_else(|| {
                    AppError::domain(format!("member {} has a non-numeric price", member.id))
                })?;
            }
        }

        let auto_price = bundle.auto_price;
        self.bundles.modify(&bundle.id, move |mut b| {
            b.products = survivors.clone();
            b.active = active;
            if auto_price {
                b.price = from_cents(price_cents);
            }
            b
        })?;
        Ok(())
    }
}

fn matches_deleted(member: &BundleMember, deleted_id: &str, kind: DeletedRef) -> bool {
    match kind {
        DeletedRef::Product => !member.is_variant() && member.id == deleted_id,
        DeletedRef::Variant => member.is_variant() && member.id == deleted_id,
    }
}
