use std::sync::Arc;

use serde_json::{json, Map, Value};

use tillpoint_domain::{
    from_cents, has_errors, sanitize_numeric, to_cents, validate_bundle, validate_product, Bundle,
    BundleMember, Product, Variant,
};
use tillpoint_store::{DocumentStore, Query, Selector};

use crate::bundles::{BundleMaintainer, DeletedRef, RepairReport};
use crate::error::AppError;
use crate::repo::{ErrorNotifier, Repository};

/// Partial update of a product. `None` fields are left untouched; `sku`
/// distinguishes "leave alone" (`None`) from "clear" (`Some(None)`).
#[derive(Debug, Default, Clone)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub price: Option<String>,
    pub active: Option<bool>,
    pub stock: Option<i64>,
    pub sku: Option<Option<String>>,
}

/// How a new bundle is priced.
#[derive(Debug, Clone)]
pub enum BundlePricing {
    /// Price derived as the sum of the members' live prices, and re-derived
    /// on every membership change.
    Auto,
    /// Manually priced, locked against per-sale adjustment.
    Fixed(String),
    /// Manually priced.
    Manual(String),
}

/// CRUD orchestration for the product/variant/bundle catalog.
///
/// Deletion here is a contract: a product or variant is never removed
/// without the dependent bundles being repaired in the same logical
/// operation.
pub struct Catalog {
    products: Repository<Product>,
    variants: Repository<Variant>,
    bundles: Repository<Bundle>,
}

impl Catalog {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            products: Repository::new(Arc::clone(&store)),
            variants: Repository::new(Arc::clone(&store)),
            bundles: Repository::new(store),
        }
    }

    /// Like [`Catalog::new`], with an error observer attached to every
    /// repository (used by shells that redirect on 404).
    pub fn with_notifier(store: Arc<dyn DocumentStore>, notifier: ErrorNotifier) -> Self {
        Self {
            products: Repository::new(Arc::clone(&store)).with_notifier(notifier.clone()),
            variants: Repository::new(Arc::clone(&store)).with_notifier(notifier.clone()),
            bundles: Repository::new(store).with_notifier(notifier),
        }
    }

    pub fn products(&self) -> &Repository<Product> {
        &self.products
    }

    pub fn variants(&self) -> &Repository<Variant> {
        &self.variants
    }

    pub fn bundles(&self) -> &Repository<Bundle> {
        &self.bundles
    }

    pub fn create_product(&self, name: &str, price: &str) -> Result<Product, AppError> {
        let product = Product::new(name.trim(), sanitize_numeric(price));
        self.check(validate_product(&product))?;
        self.products.insert(&product)?;
        Ok(product)
    }

    pub fn update_product(&self, id: &str, patch: ProductPatch) -> Result<Product, AppError> {
        if let Some(Some(sku)) = &patch.sku {
            self.check_sku_free(sku, id)?;
        }

        let mut fields = Map::new();
        if let Some(name) = patch.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(AppError::domain("Name is required"));
            }
            fields.insert("name".into(), json!(name));
        }
        if let Some(price) = patch.price {
            let price = sanitize_numeric(&price);
            if to_cents(&price).is_none() {
                return Err(AppError::domain("Price must be numeric"));
            }
            fields.insert("price".into(), json!(price));
        }
        if let Some(active) = patch.active {
            fields.insert("active".into(), json!(active));
        }
        if let Some(stock) = patch.stock {
            fields.insert("stock".into(), json!(stock));
        }
        if let Some(sku) = patch.sku {
            fields.insert("sku".into(), json!(sku));
        }
        self.products.update(id, Value::Object(fields))
    }

    pub fn create_variant(
        &self,
        product_id: &str,
        name: &str,
        price: &str,
    ) -> Result<Variant, AppError> {
        let product = self.products.require(product_id)?;
        if name.trim().is_empty() {
            return Err(AppError::domain("Name is required"));
        }
        let price = sanitize_numeric(price);
        if to_cents(&price).map(|c| c < 0).unwrap_or(true) {
            return Err(AppError::domain("Price must be a non-negative number"));
        }

        let variant = Variant::new(&product.id, name.trim(), price);
        self.variants.insert(&variant)?;
        let variant_id = variant.id.clone();
        self.products.modify(&product.id, move |mut p| {
            p.variants.push(variant_id.clone());
            p
        })?;
        Ok(variant)
    }

    pub fn create_bundle(
        &self,
        name: &str,
        members: Vec<BundleMember>,
        pricing: BundlePricing,
    ) -> Result<Bundle, AppError> {
        let mut bundle = Bundle::new(name.trim(), members);
        match pricing {
            BundlePricing::Auto => {
                bundle.auto_price = true;
                bundle.price = from_cents(self.sum_member_prices(&bundle.products)?);
            }
            BundlePricing::Fixed(price) => {
                bundle.fixed_price = true;
                bundle.price = sanitize_numeric(&price);
            }
            BundlePricing::Manual(price) => {
                bundle.price = sanitize_numeric(&price);
            }
        }
        self.check(validate_bundle(&bundle))?;
        self.bundles.insert(&bundle)?;
        Ok(bundle)
    }

    /// Delete a product, its variants, and repair every bundle referencing
    /// any of them before returning.
    pub fn delete_product(&self, id: &str) -> Result<RepairReport, AppError> {
        let product = self.products.require(id)?;

        for variant_id in &product.variants {
            if let Err(err) = self.variants.remove(variant_id) {
                // A dangling variant id in the list must not block deletion
                tracing::warn!(product = %id, variant = %variant_id, error = %err,
                    "could not remove variant during product deletion");
            }
        }
        self.products.remove(id)?;

        let affected = self.referencing_bundles(id, DeletedRef::Product)?;
        let mut report = self
            .maintainer()
            .repair_after_delete(id, &affected, DeletedRef::Product);

        // Bundles are re-fetched per pass so a bundle referencing both the
        // product and one of its variants is repaired from its current state.
        for variant_id in &product.variants {
            let affected = self.referencing_bundles(variant_id, DeletedRef::Variant)?;
            let pass =
                self.maintainer()
                    .repair_after_delete(variant_id, &affected, DeletedRef::Variant);
            report.repaired.extend(pass.repaired);
            report.failed.extend(pass.failed);
        }
        Ok(report)
    }

    /// Delete a variant, detach it from its product, and repair every
    /// bundle referencing it before returning.
    pub fn delete_variant(&self, id: &str) -> Result<RepairReport, AppError> {
        let variant = self.variants.require(id)?;
        let affected = self.referencing_bundles(id, DeletedRef::Variant)?;

        self.variants.remove(id)?;
        let variant_id = variant.id.clone();
        if let Err(err) = self.products.modify(&variant.product_id, move |mut p| {
            p.variants.retain(|v| v != &variant_id);
            p
        }) {
            tracing::warn!(variant = %id, product = %variant.product_id, error = %err,
                "could not detach variant from its product");
        }

        Ok(self
            .maintainer()
            .repair_after_delete(id, &affected, DeletedRef::Variant))
    }

    fn maintainer(&self) -> BundleMaintainer<'_> {
        BundleMaintainer::new(&self.products, &self.variants, &self.bundles)
    }

    /// All bundles with a membership entry pointing at the given id.
    fn referencing_bundles(
        &self,
        deleted_id: &str,
        kind: DeletedRef,
    ) -> Result<Vec<Bundle>, AppError> {
        let all = self.bundles.find(&Query::all())?;
        Ok(all
            .into_iter()
            .filter(|b| {
                b.products.iter().any(|m| {
                    m.id == deleted_id
                        && match kind {
                            DeletedRef::Product => !m.is_variant(),
                            DeletedRef::Variant => m.is_variant(),
                        }
                })
            })
            .collect())
    }

    fn sum_member_prices(&self, members: &[BundleMember]) -> Result<i64, AppError> {
        let mut cents = 0i64;
        for member in members {
            let price = if member.is_variant() {
                self.variants.require(&member.id)?.price
            } else {
                self.products.require(&member.id)?.price
            };
            cents += to_cents(&price).ok_or_else(|| {
                AppError::domain(format!("member {} has a non-numeric price", member.id))
            })?;
        }
        Ok(cents)
    }

    fn check_sku_free(&self, sku: &str, own_id: &str) -> Result<(), AppError> {
        let taken = self
            .products
            .find_one(&Query::filtered(Selector::Eq("sku".into(), json!(sku))))?;
        match taken {
            Some(other) if other.id != own_id => {
                Err(AppError::domain(format!("SKU '{sku}' is already in use")))
            }
            _ => Ok(()),
        }
    }

    /// Turn hard validation findings into a domain error.
    fn check(&self, findings: Vec<tillpoint_domain::ValidationError>) -> Result<(), AppError> {
        if has_errors(&findings) {
            let messages: Vec<String> = findings.into_iter().map(|f| f.message).collect();
            return Err(AppError::Domain(messages.join("; ")));
        }
        Ok(())
    }
}
