//! Test doubles and common utilities for contract tests
//!
//! The mock provider keeps a live record set so that consecutive cycles
//! observe the effect of earlier mutations.

#![allow(dead_code)]

use vdns_core::error::{Error, Result};
use vdns_core::{AddressFamily, AddressResolver, DnsProvider, DnsRecord, IpSource, Reconciler};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const DOMAIN: &str = "example.com";
pub const SUBDOMAIN: &str = "home";

/// A provider call, logged when it takes effect
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List,
    Delete(String),
    Create(AddressFamily, String),
}

/// A DnsProvider backed by an in-memory record set
#[derive(Default)]
pub struct MockDnsProvider {
    records: Mutex<Vec<DnsRecord>>,
    calls: Mutex<Vec<Call>>,
    next_id: AtomicUsize,
    fail_listing: AtomicBool,
    failing_deletes: Mutex<HashSet<String>>,
    vanished_deletes: Mutex<HashSet<String>>,
    failing_creates: Mutex<HashSet<AddressFamily>>,
    list_delay: Mutex<Option<Duration>>,
    delete_delay: Mutex<Option<Duration>>,
    lists_in_flight: AtomicUsize,
    max_lists_in_flight: AtomicUsize,
}

impl MockDnsProvider {
    pub fn new(records: Vec<DnsRecord>) -> Arc<Self> {
        Arc::new(Self {
            records: Mutex::new(records),
            next_id: AtomicUsize::new(1000),
            ..Default::default()
        })
    }

    /// Make every listing fail
    pub fn fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    /// Make deleting `id` fail with a transport error
    pub fn fail_delete(&self, id: &str) {
        self.failing_deletes.lock().unwrap().insert(id.to_string());
    }

    /// Make deleting `id` fail with NotFound (removed out-of-band)
    pub fn vanish_on_delete(&self, id: &str) {
        self.vanished_deletes.lock().unwrap().insert(id.to_string());
    }

    /// Make creating a record of `family` fail
    pub fn fail_create(&self, family: AddressFamily) {
        self.failing_creates.lock().unwrap().insert(family);
    }

    /// Delay every listing (virtual time in paused tests)
    pub fn set_list_delay(&self, delay: Duration) {
        *self.list_delay.lock().unwrap() = Some(delay);
    }

    /// Delay every deletion before it takes effect
    pub fn set_delete_delay(&self, delay: Duration) {
        *self.delete_delay.lock().unwrap() = Some(delay);
    }

    /// Every call made so far, in the order it took effect
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Create and delete calls only
    pub fn mutations(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, Call::List))
            .collect()
    }

    pub fn list_count(&self) -> usize {
        self.calls().iter().filter(|c| matches!(c, Call::List)).count()
    }

    pub fn max_lists_in_flight(&self) -> usize {
        self.max_lists_in_flight.load(Ordering::SeqCst)
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Current managed records of `family`
    pub fn values(&self, family: AddressFamily) -> Vec<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.is_managed(SUBDOMAIN, family))
            .map(|r| r.value.clone())
            .collect()
    }

    pub fn records(&self) -> Vec<DnsRecord> {
        self.records.lock().unwrap().clone()
    }

    fn log(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn list_records(&self, _domain: &str) -> Result<Vec<DnsRecord>> {
        let in_flight = self.lists_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_lists_in_flight.fetch_max(in_flight, Ordering::SeqCst);
        self.log(Call::List);

        let delay = *self.list_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.lists_in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(Error::provider("mock", "listing unavailable"));
        }
        Ok(self.records.lock().unwrap().clone())
    }

    async fn create_record(
        &self,
        _domain: &str,
        name: &str,
        family: AddressFamily,
        value: &str,
    ) -> Result<()> {
        self.log(Call::Create(family, value.to_string()));

        if self.failing_creates.lock().unwrap().contains(&family) {
            return Err(Error::provider("mock", "create rejected"));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
        self.records
            .lock()
            .unwrap()
            .push(DnsRecord::new(id, name, family.record_type(), value));
        Ok(())
    }

    async fn delete_record(&self, _domain: &str, id: &str) -> Result<()> {
        let delay = *self.delete_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.log(Call::Delete(id.to_string()));

        if self.failing_deletes.lock().unwrap().contains(id) {
            return Err(Error::provider("mock", "delete rejected"));
        }
        if self.vanished_deletes.lock().unwrap().contains(id) {
            return Err(Error::not_found(id.to_string()));
        }

        self.records.lock().unwrap().retain(|r| r.id != id);
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// An IpSource with a fixed answer and a call counter
pub struct StaticIpSource {
    family: AddressFamily,
    name: String,
    answer: Option<String>,
    calls: Arc<AtomicUsize>,
}

impl StaticIpSource {
    /// A source that answers `value`
    pub fn ok(family: AddressFamily, name: &str, value: &str) -> Self {
        Self {
            family,
            name: name.to_string(),
            answer: Some(value.to_string()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A source that always fails
    pub fn failing(family: AddressFamily, name: &str) -> Self {
        Self {
            family,
            name: name.to_string(),
            answer: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared handle on the number of fetch() calls
    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    pub fn boxed(self) -> Box<dyn IpSource> {
        Box::new(self)
    }
}

#[async_trait::async_trait]
impl IpSource for StaticIpSource {
    async fn fetch(&self) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer
            .clone()
            .ok_or_else(|| Error::http(format!("{} unreachable", self.name)))
    }

    fn family(&self) -> AddressFamily {
        self.family
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Resolver with one source per family; `None` means that source fails
pub fn resolver(v4: Option<&str>, v6: Option<&str>) -> AddressResolver {
    let v4 = match v4 {
        Some(value) => StaticIpSource::ok(AddressFamily::V4, "v4", value),
        None => StaticIpSource::failing(AddressFamily::V4, "v4"),
    };
    let v6 = match v6 {
        Some(value) => StaticIpSource::ok(AddressFamily::V6, "v6", value),
        None => StaticIpSource::failing(AddressFamily::V6, "v6"),
    };
    AddressResolver::new().with_source(v4.boxed()).with_source(v6.boxed())
}

/// Reconciler for `home.example.com` over `provider`
pub fn reconciler(
    provider: &Arc<MockDnsProvider>,
    v4: Option<&str>,
    v6: Option<&str>,
) -> Reconciler {
    let provider: Arc<dyn DnsProvider> = provider.clone();
    Reconciler::new(resolver(v4, v6), provider, DOMAIN, SUBDOMAIN)
}

pub fn a(id: &str, value: &str) -> DnsRecord {
    DnsRecord::new(id, SUBDOMAIN, vdns_core::RecordType::A, value)
}

pub fn aaaa(id: &str, value: &str) -> DnsRecord {
    DnsRecord::new(id, SUBDOMAIN, vdns_core::RecordType::Aaaa, value)
}
