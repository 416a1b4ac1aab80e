use std::time::Duration;

use trust_dns_resolver::{
    Resolver,
    error::{ResolveError, ResolveErrorKind},
    proto::op::ResponseCode,
    system_conf::read_system_conf,
};

use super::{Error, MxRecord, MxStatus};

/// Bound applied to the MX query when the caller does not supply one.
pub(crate) const DEFAULT_DNS_TIMEOUT: Duration = Duration::from_secs(5);

/// Look up MX records for `domain` using the system resolver.
///
/// The domain is normalized via IDNA before querying DNS. The resulting
/// [`MxStatus`] lists records ascending by priority, ties in query order.
pub fn check_mx(domain: &str) -> Result<MxStatus, Error> {
    check_mx_with_timeout(domain, DEFAULT_DNS_TIMEOUT)
}

/// Same as [`check_mx`], with an explicit bound on the DNS query.
pub fn check_mx_with_timeout(domain: &str, timeout: Duration) -> Result<MxStatus, Error> {
    let ascii = normalize_domain(domain)?;
    let resolver = system_resolver(timeout)?;
    resolve_with(&resolver, &ascii)
}

fn system_resolver(timeout: Duration) -> Result<Resolver, Error> {
    let (config, mut opts) = read_system_conf().map_err(Error::resolver_init)?;
    opts.timeout = timeout;
    Resolver::new(config, opts).map_err(Error::resolver_init)
}

pub(crate) fn resolve_with<R>(resolver: &R, ascii_domain: &str) -> Result<MxStatus, Error>
where
    R: LookupMx,
{
    let mut records = resolver.lookup_mx(ascii_domain).map_err(Error::lookup)?;

    // Stable sort: records with equal priority keep the order the query
    // returned them in.
    records.sort_by_key(|record| record.priority);

    #[cfg(feature = "with-tracing")]
    tracing::debug!(domain = ascii_domain, count = records.len(), "MX lookup");

    if records.is_empty() {
        Ok(MxStatus::NoRecords)
    } else {
        Ok(MxStatus::Records(records))
    }
}

pub(crate) fn normalize_domain(domain: &str) -> Result<String, Error> {
    let trimmed = domain.trim();
    if trimmed.is_empty() {
        return Err(Error::EmptyDomain);
    }
    idna::domain_to_ascii(trimmed).map_err(Error::idna)
}

pub(crate) fn normalize_host(host: String) -> String {
    let trimmed = host.trim_end_matches('.');
    trimmed.to_ascii_lowercase()
}

pub(crate) trait LookupMx {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, ResolveError>;
}

impl LookupMx for Resolver {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, ResolveError> {
        let lookup = match Resolver::mx_lookup(self, domain) {
            Ok(lookup) => lookup,
            // A domain that exists but has no MX records is a verdict, not a
            // failure. NXDOMAIN and transport errors stay errors.
            Err(err) if is_negative_answer(&err) => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };
        let mut records = Vec::new();
        for mx in lookup.iter() {
            let host = normalize_host(mx.exchange().to_utf8());
            records.push(MxRecord::new(mx.preference(), host));
        }
        Ok(records)
    }
}

fn is_negative_answer(err: &ResolveError) -> bool {
    matches!(
        err.kind(),
        ResolveErrorKind::NoRecordsFound { response_code, .. }
            if *response_code == ResponseCode::NoError
    )
}

#[cfg(test)]
impl LookupMx for crate::mx::tests::StubResolver {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, ResolveError> {
        (self.on_lookup)(domain)
    }
}
