use recstore::client::RecordStoreClient;
use recstore::error::StoreResult;
use recstore::store::base::RecordStore;
use recstore::types::{Key, Record, Value};

/// Field holding the customer phone number. It is the indexed field.
pub const PHONE_FIELD: &str = "phone";

/// Field holding the customer lifetime value.
pub const LTV_FIELD: &str = "ltv";

/// A customer record as written by the scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    pub id: u32,
    pub phone: String,
    pub ltv: String,
}

impl Customer {
    /// Generated customer number `id`, with phone `phone_{id}` and lifetime value `ltv_{id}`.
    pub fn seeded(id: u32) -> Self {
        Self {
            id,
            phone: format!("phone_{id}"),
            ltv: format!("ltv_{id}"),
        }
    }

    pub fn to_record(&self) -> Record {
        Record::new()
            .with(PHONE_FIELD, self.phone.as_str())
            .with(LTV_FIELD, self.ltv.as_str())
    }
}

/// Namespace and set the customers live in.
#[derive(Debug, Clone, Copy)]
pub struct CustomerSet<'a> {
    pub namespace: &'a str,
    pub set: &'a str,
}

impl<'a> CustomerSet<'a> {
    pub fn new(namespace: &'a str, set: &'a str) -> Self {
        Self { namespace, set }
    }

    pub fn key(&self, id: u32) -> Key {
        Key::new(self.namespace, self.set, id)
    }
}

pub async fn add_customer<S: RecordStore>(
    client: &RecordStoreClient<S>,
    customers: CustomerSet<'_>,
    customer: &Customer,
) -> StoreResult<()> {
    client
        .put_record(&customers.key(customer.id), customer.to_record())
        .await
}

/// Returns the lifetime value of customer `id`, or `None` when it cannot be read.
pub async fn ltv_by_customer_id<S: RecordStore>(
    client: &RecordStoreClient<S>,
    customers: CustomerSet<'_>,
    id: u32,
) -> Option<String> {
    let lookup = client.get_by_key(&customers.key(id)).await;

    lookup.field(LTV_FIELD).and_then(Value::as_str).map(str::to_owned)
}

/// Returns the lifetime value of the customer owning `phone`, or `None` when it cannot be read.
pub async fn ltv_by_phone<S: RecordStore>(
    client: &RecordStoreClient<S>,
    customers: CustomerSet<'_>,
    phone: &str,
) -> Option<String> {
    let lookup = client
        .get_by_indexed_field(
            customers.namespace,
            customers.set,
            PHONE_FIELD,
            &Value::from(phone),
            &[PHONE_FIELD, LTV_FIELD],
        )
        .await;

    lookup.field(LTV_FIELD).and_then(Value::as_str).map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use recstore::store::memory::MemoryStore;

    #[test]
    fn seeded_customer_follows_the_numbering() {
        let customer = Customer::seeded(7);

        assert_eq!(customer.phone, "phone_7");
        assert_eq!(customer.ltv, "ltv_7");
        assert_eq!(customer.to_record().len(), 2);
    }

    #[tokio::test]
    async fn lifetime_value_is_found_by_id_and_phone() {
        let client = RecordStoreClient::new(MemoryStore::new());
        let customers = CustomerSet::new("test", "phones");
        client
            .create_index(customers.namespace, customers.set, PHONE_FIELD)
            .await
            .unwrap();

        add_customer(&client, customers, &Customer::seeded(3)).await.unwrap();

        assert_eq!(ltv_by_customer_id(&client, customers, 3).await.as_deref(), Some("ltv_3"));
        assert_eq!(ltv_by_phone(&client, customers, "phone_3").await.as_deref(), Some("ltv_3"));
        assert_eq!(ltv_by_customer_id(&client, customers, 4).await, None);
        assert_eq!(ltv_by_phone(&client, customers, "phone_4").await, None);
    }
}
