#![allow(non_snake_case)]
use lucky_ten::{
    GameError,
    WalletSession,
    provider::{
        ProviderEvent,
        UNRECOGNIZED_CHAIN,
        USER_REJECTED,
    },
    session::{
        BASE_CHAIN_ID,
        SessionChange,
        TargetChain,
    },
    test_helpers::*,
};
use serde_json::json;

fn session() -> WalletSession<MockProvider> {
    WalletSession::new(TargetChain::base())
}

#[tokio::test]
async fn connect__prefers_embedded_host_when_it_returns_accounts() {
    // given
    let host = MockProvider::embedded_host();
    host.respond("eth_requestAccounts", json!([account(0xaa)]));
    host.respond("wallet_switchEthereumChain", json!(null));
    let injected = MockProvider::ready_wallet(account(0xbb));
    let source = MockProviderSource {
        embedded: Some(host),
        injected: Some(injected.clone()),
    };
    let mut session = session();

    // when
    let address = session.connect(&source).await.unwrap();

    // then
    assert_eq!(account(0xaa), address);
    assert!(injected.calls().is_empty());
    assert!(session.on_target_network());
}

#[tokio::test]
async fn connect__falls_back_to_injected_when_host_has_no_accounts() {
    // given
    let host = MockProvider::embedded_host();
    host.respond("eth_requestAccounts", json!([]));
    let source = MockProviderSource {
        embedded: Some(host),
        injected: Some(MockProvider::ready_wallet(account(0xbb))),
    };
    let mut session = session();

    // when
    let address = session.connect(&source).await.unwrap();

    // then
    assert_eq!(account(0xbb), address);
    assert_eq!(Some(account(0xbb)), session.address());
}

#[tokio::test]
async fn connect__without_any_provider_is_no_provider_found() {
    let mut session = session();

    let err = session.connect(&MockProviderSource::default()).await.unwrap_err();

    assert_eq!(GameError::NoProviderFound, err);
    assert!(!session.is_connected());
}

#[tokio::test]
async fn connect__empty_account_list_is_no_accounts_returned() {
    let wallet = MockProvider::injected();
    wallet.respond("eth_requestAccounts", json!([]));
    let mut session = session();

    let err = session
        .connect(&MockProviderSource::injected(wallet))
        .await
        .unwrap_err();

    assert_eq!(GameError::NoAccountsReturned, err);
    assert_eq!(None, session.address());
}

#[tokio::test]
async fn connect__falls_back_to_eth_accounts_when_request_is_unsupported() {
    // given
    let wallet = MockProvider::injected();
    wallet.respond("eth_accounts", json!([account(0x33)]));
    wallet.respond("wallet_switchEthereumChain", json!(null));
    let mut session = session();

    // when
    let address = session
        .connect(&MockProviderSource::injected(wallet.clone()))
        .await
        .unwrap();

    // then
    assert_eq!(account(0x33), address);
    assert_eq!(1, wallet.calls_to("eth_requestAccounts").len());
}

#[tokio::test]
async fn connect__adds_target_chain_when_wallet_does_not_know_it() {
    // given
    let wallet = MockProvider::injected();
    wallet.respond("eth_requestAccounts", json!([account(0x11)]));
    wallet.fail("wallet_switchEthereumChain", UNRECOGNIZED_CHAIN, "Unrecognized chain");
    wallet.respond("wallet_addEthereumChain", json!(null));
    let mut session = session();

    // when
    session
        .connect(&MockProviderSource::injected(wallet.clone()))
        .await
        .unwrap();

    // then
    let added = wallet.calls_to("wallet_addEthereumChain");
    assert_eq!(1, added.len());
    let params = &added[0][0];
    assert_eq!("0x2105", params["chainId"]);
    assert_eq!("Base", params["chainName"]);
    assert_eq!(18, params["nativeCurrency"]["decimals"]);
    assert_eq!("https://mainnet.base.org", params["rpcUrls"][0]);
    assert_eq!("https://basescan.org", params["blockExplorerUrls"][0]);
    assert_eq!(Some(BASE_CHAIN_ID), session.network());
}

#[tokio::test]
async fn connect__refused_switch_leaves_session_disconnected() {
    let wallet = MockProvider::injected();
    wallet.respond("eth_requestAccounts", json!([account(0x11)]));
    wallet.fail("wallet_switchEthereumChain", USER_REJECTED, "User rejected");
    let mut session = session();

    let err = session
        .connect(&MockProviderSource::injected(wallet))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        GameError::NetworkSwitchFailed {
            chain_id: BASE_CHAIN_ID,
            ..
        }
    ));
    assert!(!session.is_connected());
}

#[tokio::test]
async fn next_event__delivers_account_changes_from_the_wallet() {
    // given
    let wallet = MockProvider::ready_wallet(account(0x11));
    let mut session = session();
    session
        .connect(&MockProviderSource::injected(wallet.clone()))
        .await
        .unwrap();

    // when
    assert!(wallet.emit(ProviderEvent::AccountsChanged(vec![account(0x22)])));
    let event = session.next_event().await;
    let change = session.handle_event(event);

    // then
    assert_eq!(SessionChange::AccountSwitched(account(0x22)), change);
    assert_eq!(Some(account(0x22)), session.address());
}

#[tokio::test]
async fn handle_event__empty_accounts_disconnects() {
    let wallet = MockProvider::ready_wallet(account(0x11));
    let mut session = session();
    session
        .connect(&MockProviderSource::injected(wallet))
        .await
        .unwrap();

    let change = session.handle_event(ProviderEvent::AccountsChanged(vec![]));

    assert_eq!(SessionChange::Disconnected, change);
    assert!(!session.is_connected());
    assert_eq!(None, session.address());
}

#[tokio::test]
async fn handle_event__chain_change_away_from_base_is_reported() {
    let wallet = MockProvider::ready_wallet(account(0x11));
    let mut session = session();
    session
        .connect(&MockProviderSource::injected(wallet))
        .await
        .unwrap();

    let change = session.handle_event(ProviderEvent::ChainChanged(1));

    assert_eq!(
        SessionChange::NetworkChanged {
            chain_id: 1,
            on_target: false
        },
        change
    );
    assert!(!session.on_target_network());
    assert!(session.is_connected());
}

#[tokio::test]
async fn disconnect__drops_the_change_subscription() {
    // given
    let wallet = MockProvider::ready_wallet(account(0x11));
    let mut session = session();
    session
        .connect(&MockProviderSource::injected(wallet.clone()))
        .await
        .unwrap();

    // when
    session.disconnect();

    // then
    assert!(!wallet.emit(ProviderEvent::ChainChanged(1)));
}
