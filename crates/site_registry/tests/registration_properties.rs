//! Property tests for registration and lookup.

use proptest::prelude::*;
use scrapesafe_site_registry::{
    DomainPolicy, MemorySiteRegistrationStore, RegistrationService, SiteRegistrationStore,
};
use std::sync::Arc;

fn domain_strategy() -> impl Strategy<Value = String> {
    (
        prop::collection::vec("[a-z0-9]([a-z0-9-]{0,10}[a-z0-9])?", 1..4),
        "[a-zA-Z]{2,6}",
    )
        .prop_map(|(labels, tld)| format!("{}.{}", labels.join("."), tld))
}

fn wallet_strategy() -> impl Strategy<Value = String> {
    "[0-9a-fA-F]{40}".prop_map(|hex| format!("0x{hex}"))
}

fn new_service() -> (RegistrationService, MemorySiteRegistrationStore) {
    let store = MemorySiteRegistrationStore::new();
    let service = RegistrationService::new(Arc::new(store.clone()), DomainPolicy::default());
    (service, store)
}

proptest! {
    #[test]
    fn register_then_lookup_is_unverified_with_same_token(
        domain in domain_strategy(),
        wallet in wallet_strategy(),
    ) {
        let (service, _) = new_service();
        let registered = service.register(&domain, &wallet).unwrap();
        let reg = registered.registration;

        let looked_up = service.lookup(reg.site_id).unwrap().unwrap();
        prop_assert!(!looked_up.verified);
        prop_assert_eq!(&looked_up.verification_token, &reg.verification_token);
        prop_assert_eq!(looked_up.domain, domain.to_ascii_lowercase());
        prop_assert_eq!(looked_up.owner_wallet, wallet.to_ascii_lowercase());
    }

    #[test]
    fn repeated_registration_returns_same_claim(
        domain in domain_strategy(),
        wallet in wallet_strategy(),
        repeats in 2usize..5,
    ) {
        let (service, store) = new_service();
        let first = service.register(&domain, &wallet).unwrap().registration;

        for _ in 1..repeats {
            let again = service.register(&domain, &wallet).unwrap();
            prop_assert!(!again.created);
            prop_assert_eq!(again.registration.site_id, first.site_id);
            prop_assert_eq!(&again.registration.verification_token, &first.verification_token);
        }
        prop_assert_eq!(store.count().unwrap(), 1);
    }
}
