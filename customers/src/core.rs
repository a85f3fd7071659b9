use std::fmt;

use config::shared::CustomersConfig;
use recstore::client::RecordStoreClient;
use recstore::store::base::RecordStore;
use tracing::{info, warn};

use crate::customer::{
    Customer, CustomerSet, PHONE_FIELD, add_customer, ltv_by_customer_id, ltv_by_phone,
};

/// How a customer was looked up during verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupMethod {
    ById,
    ByPhone,
}

impl fmt::Display for LookupMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupMethod::ById => f.write_str("by id"),
            LookupMethod::ByPhone => f.write_str("by phone"),
        }
    }
}

/// A lifetime value that did not read back as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub customer_id: u32,
    pub method: LookupMethod,
    pub expected: String,
    pub actual: Option<String>,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "customer {} {}: expected ltv '{}', got ",
            self.customer_id, self.method, self.expected
        )?;
        match &self.actual {
            Some(actual) => write!(f, "'{actual}'"),
            None => f.write_str("nothing"),
        }
    }
}

/// Result of reading back every seeded customer.
#[derive(Debug, Default)]
pub struct VerificationReport {
    checked: usize,
    mismatches: Vec<Mismatch>,
}

impl VerificationReport {
    fn check(&mut self, customer: &Customer, method: LookupMethod, actual: Option<String>) {
        self.checked += 1;
        if actual.as_deref() != Some(customer.ltv.as_str()) {
            self.mismatches.push(Mismatch {
                customer_id: customer.id,
                method,
                expected: customer.ltv.clone(),
                actual,
            });
        }
    }

    pub fn checked(&self) -> usize {
        self.checked
    }

    pub fn mismatches(&self) -> &[Mismatch] {
        &self.mismatches
    }

    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Connects to the configured store, runs the scenario and disconnects.
///
/// Fails only when the connection cannot be opened or closed. Everything else ends up in the
/// returned report.
pub async fn start_customers_with_config(config: CustomersConfig) -> anyhow::Result<VerificationReport> {
    info!(
        hosts = %config.store.hosts_display(),
        namespace = %config.store.namespace,
        set = %config.store.set_name,
        count = config.seed.count,
        "starting customers scenario"
    );

    let client = RecordStoreClient::connect(&config.store).await?;
    let customers = CustomerSet::new(&config.store.namespace, &config.store.set_name);

    let report = run_scenario(&client, customers, config.seed.count).await;

    client.close().await?;

    Ok(report)
}

/// Indexes the phone field, writes customers `1..=count` and reads each of them back by id
/// and by phone.
///
/// Index and write failures are already logged by the client and do not stop the run. Their
/// effect shows up as mismatches.
pub async fn run_scenario<S: RecordStore>(
    client: &RecordStoreClient<S>,
    customers: CustomerSet<'_>,
    count: u32,
) -> VerificationReport {
    // An index left over from a previous run is fine.
    let _ = client
        .create_index(customers.namespace, customers.set, PHONE_FIELD)
        .await;

    let mut written = 0;
    for id in 1..=count {
        if add_customer(client, customers, &Customer::seeded(id)).await.is_ok() {
            written += 1;
        }
    }
    info!(written, count, "customers written");

    let mut report = VerificationReport::default();
    for id in 1..=count {
        let customer = Customer::seeded(id);

        let by_id = ltv_by_customer_id(client, customers, id).await;
        report.check(&customer, LookupMethod::ById, by_id);

        let by_phone = ltv_by_phone(client, customers, &customer.phone).await;
        report.check(&customer, LookupMethod::ByPhone, by_phone);
    }

    if report.is_clean() {
        info!(checked = report.checked(), "all customers verified");
    } else {
        warn!(
            checked = report.checked(),
            mismatches = report.mismatches().len(),
            "customers failed verification"
        );
    }

    report
}
