//! Public builder and signer API, plus signature properties.

use proptest::prelude::*;
use rust_decimal::Decimal;
use wxpay_transfer::{
    merchant::{ClientCertificate, MerchantContext, Secret},
    protocol::{
        BankCardTransfer, PeerTransfer, RequestKind, SignType, SigningKey, TransferQuery,
        TransferRequest, build, build_with_nonce, interpret, sign,
        signer::signing_string,
        verify,
        xml::{decode, encode},
    },
};

const KEY: &str = "192006250b4c09247ec02edce69f6a2d";
const NONCE: &str = "5K8264ILTKCH16CQ2502SI8ZNMTM67VS";

fn merchant(sign_type: SignType) -> MerchantContext {
    MerchantContext::new(
        1,
        "1900000109",
        SigningKey::new(KEY, sign_type),
        ClientCertificate::Pkcs12 { der: Secret::new(vec![0x30]), password: Secret::from("pw") },
    )
    .with_app_id("wx8888888888888888")
    .with_spbill_create_ip("203.0.113.7")
}

fn peer_request() -> TransferRequest {
    PeerTransfer::new("T202401010001", "oUpF8uMuAJO_M2pxb1Q9zNjWeS6o", Decimal::new(1234, 2), "refund")
        .with_verified_name("Zhang San")
        .into()
}

#[test]
fn test_documented_signature_vector() {
    let fields = [
        ("appid", "wxd930ea5d5a258f4f"),
        ("mch_id", "10000100"),
        ("device_info", "1000"),
        ("body", "test"),
        ("nonce_str", "ibuaiVcKdpRxkhJA"),
    ];
    assert_eq!(
        signing_string(fields),
        "appid=wxd930ea5d5a258f4f&body=test&device_info=1000&mch_id=10000100&nonce_str=ibuaiVcKdpRxkhJA"
    );
    assert_eq!(sign(fields, &SigningKey::new(KEY, SignType::Md5)), "9A0A8659F005D6984697E2CA0A9CF3B7");
}

#[test]
fn test_peer_transfer_document() {
    let merchant = merchant(SignType::Md5);
    let fields = build_with_nonce(&peer_request(), &merchant, NONCE).unwrap();
    let envelope = fields.sign(merchant.signing_key());

    let document = envelope.to_document();
    assert!(document.starts_with("<xml>"));
    assert!(document.ends_with("</xml>"));

    let parsed = decode(&document).unwrap();
    let expected = [
        ("amount", "1234"),
        ("check_name", "FORCE_CHECK"),
        ("desc", "refund"),
        ("mch_appid", "wx8888888888888888"),
        ("mchid", "1900000109"),
        ("nonce_str", NONCE),
        ("openid", "oUpF8uMuAJO_M2pxb1Q9zNjWeS6o"),
        ("partner_trade_no", "T202401010001"),
        ("re_user_name", "Zhang San"),
        ("spbill_create_ip", "203.0.113.7"),
    ];
    for (name, value) in expected {
        assert_eq!(parsed.get(name).map(String::as_str), Some(value), "field {name}");
    }
    assert!(!parsed.contains_key("sign_type"));
    assert_eq!(parsed.len(), expected.len() + 1);
    assert_eq!(parsed.get("sign").map(String::as_str), Some(envelope.signature()));
    assert!(verify(parsed.iter().map(|(k, v)| (k.as_str(), v.as_str())), merchant.signing_key()));
}

#[test]
fn test_signature_is_reproducible_for_fixed_nonce() {
    let merchant = merchant(SignType::Md5);
    let first = build_with_nonce(&peer_request(), &merchant, NONCE).unwrap().sign(merchant.signing_key());
    let second = build_with_nonce(&peer_request(), &merchant, NONCE).unwrap().sign(merchant.signing_key());
    assert_eq!(first.signature(), second.signature());
    assert_eq!(first.to_document(), second.to_document());

    let fresh = build(&peer_request(), &merchant).unwrap().sign(merchant.signing_key());
    assert_ne!(fresh.fields().get("nonce_str"), Some(NONCE));
    assert_ne!(fresh.signature(), first.signature());
}

#[test]
fn test_hmac_merchant_signs_sign_type() {
    let merchant = merchant(SignType::HmacSha256);
    let envelope = build_with_nonce(&peer_request(), &merchant, NONCE)
        .unwrap()
        .sign(merchant.signing_key());

    assert_eq!(envelope.fields().get("sign_type"), Some("HMAC-SHA256"));
    assert_eq!(envelope.signature().len(), 64);
    assert!(envelope.verify(merchant.signing_key()));
    assert!(!envelope.verify(&SigningKey::new(KEY, SignType::Md5)));
}

#[test]
fn test_query_variants_carry_only_their_fields() {
    let merchant = merchant(SignType::Md5);

    let bank = build_with_nonce(
        &TransferRequest::BankCardQuery(TransferQuery::new("B1")),
        &merchant,
        NONCE,
    )
    .unwrap();
    let names: Vec<&str> = bank.names().collect();
    assert_eq!(names, ["mch_id", "nonce_str", "partner_trade_no"]);

    let peer = build_with_nonce(
        &TransferRequest::PeerTransferQuery(TransferQuery::new("T1")),
        &merchant,
        NONCE,
    )
    .unwrap();
    let names: Vec<&str> = peer.names().collect();
    assert_eq!(names, ["appid", "mch_id", "nonce_str", "partner_trade_no"]);
}

#[test]
fn test_bank_transfer_plaintext_before_encryption() {
    let merchant = merchant(SignType::Md5);
    let request = TransferRequest::from(BankCardTransfer::new(
        "B202401010001",
        "6222020000001234",
        "Li Si",
        "1002",
        Decimal::new(50000, 2),
        "payout",
    ));

    let fields = build_with_nonce(&request, &merchant, NONCE).unwrap();
    assert_eq!(fields.get("amount"), Some("50000"));
    assert_eq!(fields.get("bank_code"), Some("1002"));
    assert!(fields.contains("enc_bank_no"));
    assert!(!fields.contains("spbill_create_ip"));
    assert!(!format!("{fields:?}").contains("6222020000001234"));
    assert_eq!(request.payee().as_deref(), Some("************1234"));
}

#[test]
fn test_result_serializes_with_status_tag() {
    let key = SigningKey::new(KEY, SignType::Md5);
    let body = encode([
        ("return_code", "SUCCESS"),
        ("result_code", "SUCCESS"),
        ("partner_trade_no", "T1"),
        ("payment_no", "1000018301201505190181489473"),
    ]);

    let result = interpret(RequestKind::PeerTransfer, decode(&body).unwrap(), &key);
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["status"], "success");
    assert_eq!(json["kind"], "peer_transfer");
    assert_eq!(json["fields"]["payment_no"], "1000018301201505190181489473");
}

fn field_set() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::btree_map("[a-z_]{1,16}", "[A-Za-z0-9 .,_-]{1,32}", 1..12)
        .prop_map(|map| map.into_iter().filter(|(k, _)| k != "sign").collect())
}

fn pairs(fields: &[(String, String)]) -> impl Iterator<Item = (&str, &str)> + Clone {
    fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn test_signature_independent_of_field_order(
        fields in field_set(),
        key in "[a-zA-Z0-9]{32}",
    ) {
        let key = SigningKey::new(key, SignType::Md5);
        let mut reversed = fields.clone();
        reversed.reverse();

        prop_assert_eq!(sign(pairs(&fields), &key), sign(pairs(&reversed), &key));
    }

    #[test]
    fn test_empty_values_do_not_affect_signature(
        fields in field_set(),
        extra in "[a-z]{1,16}",
    ) {
        let key = SigningKey::new(KEY, SignType::Md5);
        prop_assume!(!fields.iter().any(|(k, _)| *k == extra));
        let mut padded = fields.clone();
        padded.push((extra, String::new()));

        prop_assert_eq!(sign(pairs(&fields), &key), sign(pairs(&padded), &key));
    }

    #[test]
    fn test_single_field_change_changes_signature(
        fields in field_set(),
        index in any::<prop::sample::Index>(),
        suffix in "[A-Za-z0-9]{1,8}",
        hmac in any::<bool>(),
    ) {
        let sign_type = if hmac { SignType::HmacSha256 } else { SignType::Md5 };
        let key = SigningKey::new(KEY, sign_type);
        let mut altered = fields.clone();
        let position = index.index(altered.len());
        altered[position].1.push_str(&suffix);

        prop_assert_ne!(sign(pairs(&fields), &key), sign(pairs(&altered), &key));
    }

    #[test]
    fn test_signed_fields_verify_only_under_signing_key(
        fields in field_set(),
        key in "[a-f0-9]{32}",
        other in "[a-f0-9]{32}",
    ) {
        prop_assume!(key != other);
        let key = SigningKey::new(key, SignType::Md5);
        let other = SigningKey::new(other, SignType::Md5);
        let signature = sign(pairs(&fields), &key);
        let mut signed = fields.clone();
        signed.push(("sign".to_owned(), signature));

        prop_assert!(verify(pairs(&signed), &key));
        prop_assert!(!verify(pairs(&signed), &other));
    }
}
