//! End-to-end lifecycle: a credit is attested and issued, sold through the
//! marketplace, and finally retired by its buyer.

use std::sync::Arc;

use arbor_contracts::certification::{credit_id, Certification, Standard};
use arbor_contracts::marketplace::Marketplace;
use arbor_contracts::registrar::{issuance_digest, Registrar};
use arbor_protocol::config::NETWORK_ID_DEVNET;
use arbor_protocol::crypto::{sign_attestation, ArborKeypair, Ed25519Recovery};
use arbor_protocol::ledger::{AssetLedger, MemoryLedger};
use arbor_protocol::payment::MemoryBank;
use arbor_protocol::time::ManualClock;

#[test]
fn issue_sell_retire() {
    let clock = ManualClock::at(1_700_000_000);
    let mut ledger = MemoryLedger::new(NETWORK_ID_DEVNET);
    let mut bank = MemoryBank::default();

    let registry_owner = ArborKeypair::generate().address();
    let mut registrar = Registrar::with_parts(
        registry_owner,
        ArborKeypair::generate().address(),
        Box::new(Ed25519Recovery),
        Arc::new(clock.clone()),
    );
    let mut market = Marketplace::with_clock(
        ArborKeypair::generate().address(),
        Arc::new(clock.clone()),
    );

    let validator = ArborKeypair::generate();
    registrar
        .add_validator(registry_owner, validator.address())
        .unwrap();

    let seller = ArborKeypair::generate().address();
    let buyer = ArborKeypair::generate().address();

    // Attested issuance.
    let cert = Certification {
        project: "Rimba Raya".into(),
        issuer: "Arbor Registry".into(),
        location: "Central Kalimantan, ID".into(),
        methodology: "VM0004".into(),
        quantity: 1_000,
        vintage: 2024,
        expiry: 0,
        standard: Standard::GoldStandard,
    };
    let salt = [42u8; 32];
    let digest = issuance_digest(
        registrar.address(),
        ledger.network_id(),
        credit_id(&cert, &salt),
        b"verification report #1187",
    );
    let signature = sign_attestation(&validator, &digest);
    let credit = registrar
        .issue(
            &mut ledger,
            seller,
            cert.clone(),
            seller,
            salt,
            b"verification report #1187".to_vec(),
            &signature,
        )
        .unwrap();

    // Escrowed sale.
    let listing = market
        .list(&mut ledger, seller, credit, 9_000, 0, [7u8; 32])
        .unwrap();
    assert_eq!(ledger.owner_of(credit).unwrap(), market.address());

    clock.advance(86_400);
    market
        .fulfill(&mut ledger, &mut bank, buyer, listing, 10_000)
        .unwrap();
    assert_eq!(ledger.owner_of(credit).unwrap(), buyer);
    assert_eq!(bank.balance_of(buyer), 1_000);
    assert_eq!(market.proceeds(), 9_000);

    // The buyer retires the credit; the certification survives the burn.
    let returned = registrar.retire(&mut ledger, buyer, credit).unwrap();
    assert_eq!(returned, cert);
    assert!(registrar.is_credit_retired(credit));
    assert!(ledger.owner_of(credit).is_err());
}
