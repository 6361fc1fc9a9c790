#![allow(non_snake_case)]
use alloy_primitives::Address;
use lucky_ten::{
    ChainGateway,
    GameError,
    Guess,
    WalletSession,
    gateway::TransactionReceipt,
    provider::{
        TRANSPORT_ERROR,
        USER_REJECTED,
    },
    session::TargetChain,
    test_helpers::*,
};
use serde_json::json;

fn contract() -> Address {
    Address::repeat_byte(0xcc)
}

async fn connected(wallet: &MockProvider) -> WalletSession<MockProvider> {
    let mut session = WalletSession::new(TargetChain::base());
    session
        .connect(&MockProviderSource::injected(wallet.clone()))
        .await
        .unwrap();
    session
}

#[tokio::test]
async fn submit_play__sends_entry_fee_and_encoded_guess() {
    // given
    let wallet = MockProvider::ready_wallet(account(0x11));
    wallet.respond("eth_sendTransaction", json!(tx_hash(0x42)));
    let session = connected(&wallet).await;
    let gateway = ChainGateway::new(contract());

    // when
    let hash = gateway
        .submit_play(&session, Guess::new(7).unwrap())
        .await
        .unwrap();

    // then
    assert_eq!(tx_hash(0x42), hash);
    let sent = wallet.calls_to("eth_sendTransaction");
    let tx = &sent[0][0];
    assert_eq!(json!(account(0x11)), tx["from"]);
    assert_eq!(json!(contract()), tx["to"]);
    assert_eq!("0x5af3107a4000", tx["value"]);
    assert_eq!(
        format!("0x53a04b05{}07", "0".repeat(62)),
        tx["data"].as_str().unwrap()
    );
}

#[tokio::test]
async fn submit_play__wallet_rejection_is_submission_rejected() {
    let wallet = MockProvider::ready_wallet(account(0x11));
    wallet.fail("eth_sendTransaction", USER_REJECTED, "User denied transaction");
    let session = connected(&wallet).await;

    let err = ChainGateway::new(contract())
        .submit_play(&session, Guess::new(1).unwrap())
        .await
        .unwrap_err();

    assert_eq!(
        GameError::SubmissionRejected("User denied transaction".into()),
        err
    );
}

#[tokio::test]
async fn submit_play__disconnected_session_is_not_connected() {
    let session: WalletSession<MockProvider> = WalletSession::new(TargetChain::base());

    let err = ChainGateway::new(contract())
        .submit_play(&session, Guess::new(1).unwrap())
        .await
        .unwrap_err();

    assert_eq!(GameError::NotConnected, err);
}

#[tokio::test]
async fn fetch_receipt__null_means_not_mined_yet() {
    let wallet = MockProvider::injected();
    wallet.respond("eth_getTransactionReceipt", json!(null));

    let receipt = ChainGateway::new(contract())
        .fetch_receipt(&wallet, tx_hash(1))
        .await
        .unwrap();

    assert!(receipt.is_none());
}

#[tokio::test]
async fn fetch_receipt__read_failure_is_transient() {
    let wallet = MockProvider::injected();
    wallet.fail("eth_getTransactionReceipt", TRANSPORT_ERROR, "connection reset");

    let err = ChainGateway::new(contract())
        .fetch_receipt(&wallet, tx_hash(1))
        .await
        .unwrap_err();

    assert!(err.is_transient());
}

#[tokio::test]
async fn fetch_pool_balance__calls_pool_selector_on_the_contract() {
    // given
    let wallet = MockProvider::injected();
    wallet.respond("eth_call", json!("0x016345785d8a0000"));

    // when
    let pool = ChainGateway::new(contract())
        .fetch_pool_balance(&wallet)
        .await;

    // then
    assert_eq!("0.1000", pool.to_string());
    let call = &wallet.calls_to("eth_call")[0];
    assert_eq!("0xb8a93086", call[0]["data"]);
    assert_eq!(json!(contract()), call[0]["to"]);
    assert_eq!("latest", call[1]);
}

#[tokio::test]
async fn fetch_pool_balance__failure_reads_as_empty_pool() {
    let wallet = MockProvider::injected();
    wallet.fail("eth_call", TRANSPORT_ERROR, "execution reverted");

    let pool = ChainGateway::new(contract())
        .fetch_pool_balance(&wallet)
        .await;

    assert!(pool.is_zero());
}

#[tokio::test]
async fn fetch_wallet_balance__reads_native_balance() {
    let wallet = MockProvider::injected();
    wallet.respond("eth_getBalance", json!("0xde0b6b3a7640000"));

    let balance = ChainGateway::new(contract())
        .fetch_wallet_balance(&wallet, account(0x11))
        .await;

    assert_eq!(Some("1.0000".to_string()), balance.map(|b| b.to_string()));
}

#[test]
fn receipt__game_played_log_is_found_among_other_logs() {
    // given
    let mut raw = receipt_json(
        tx_hash(9),
        true,
        Some(game_played_data(2, 9, false, 0)),
    );
    let played = raw["logs"][0].clone();
    raw["logs"] = json!([
        { "topics": [tx_hash(0x77)], "data": "0x" },
        played,
    ]);

    // when
    let receipt: TransactionReceipt = serde_json::from_value(raw).unwrap();
    let log = receipt.decode_game_played().unwrap();

    // then
    assert!(receipt.succeeded());
    assert_eq!(2, log.guess);
    assert_eq!(9, log.winning_number);
    assert!(!log.won);
}

#[test]
fn receipt__without_logs_fails_to_decode() {
    let receipt: TransactionReceipt =
        serde_json::from_value(receipt_json(tx_hash(9), true, None)).unwrap();

    assert!(matches!(
        receipt.decode_game_played(),
        Err(GameError::EventDecodeFailed(_))
    ));
}
