//! End-to-end ledger scenarios.
//!
//! Each test drives a ledger on a manual clock through a realistic sequence
//! of deposits, claims and administrative calls, checking balances, reward
//! accrual and pool membership along the way.

use pillar_core::address::Address;
use pillar_core::error::LedgerError;
use pillar_core::rates::PoolCriteria;
use pillar_core::types::RewardBreakdown;
use pillar_engine::SweepProgress;
use pillar_engine::criteria::qualifies;
use pillar_tests::helpers::*;

const MILLI: u128 = 1_000_000_000_000_000;

// ------------------------------------------------------------------
// Personal yield
// ------------------------------------------------------------------

#[test]
fn ten_tokens_over_four_rounds() {
    let mut h = Harness::without_fees();
    let a = addr(1);
    h.deposit(&a, tokens(10), None).unwrap();

    h.advance_rounds(4);
    assert_eq!(h.ledger.accumulated_rewards(&a).unwrap(), 120 * MILLI);

    let receipt = h.ledger.claim(&a).unwrap();
    assert_eq!(receipt.claimed, 120 * MILLI);
    assert_eq!(receipt.fee, 0);
    assert_eq!(receipt.reinvested, 60 * MILLI);
    assert_eq!(receipt.paid_out, 60 * MILLI);
    assert_eq!(h.transfer.balance_of(&a), 60 * MILLI);
    assert_eq!(h.ledger.account(&a).unwrap().total_investment, tokens(10) + 60 * MILLI);
}

#[test]
fn partial_round_earns_nothing() {
    let mut h = Harness::without_fees();
    let a = addr(1);
    h.deposit(&a, tokens(10), None).unwrap();

    h.clock.advance(3 * ROUND + ROUND / 2);
    assert_eq!(h.ledger.accumulated_rewards(&a).unwrap(), 90 * MILLI);
    assert_eq!(
        h.ledger.last_round_rewards(&a).unwrap(),
        RewardBreakdown { personal: 30 * MILLI, referral: 0, pool: 0 }
    );

    h.clock.advance(ROUND / 2);
    assert_eq!(h.ledger.accumulated_rewards(&a).unwrap(), 120 * MILLI);
}

#[test]
fn mid_round_deposit_accrues_from_round_start() {
    let mut h = Harness::without_fees();
    let a = addr(1);
    h.clock.advance(ROUND / 3);
    h.deposit(&a, tokens(10), None).unwrap();
    assert_eq!(h.ledger.account(&a).unwrap().last_settlement, START);

    h.clock.set(START + ROUND);
    assert_eq!(h.ledger.accumulated_rewards(&a).unwrap(), 30 * MILLI);
}

#[test]
fn claim_with_fees_routes_to_both_treasuries() {
    let mut cfg = config();
    cfg.min_claim = 0;
    let mut h = Harness::new(cfg);
    let a = addr(1);

    let receipt = h.deposit(&a, tokens(1_000), None).unwrap();
    assert_eq!(receipt.net, tokens(900));
    h.advance_rounds(10);

    let claim = h.ledger.claim(&a).unwrap();
    assert_eq!(claim.claimed, tokens(27));
    assert_eq!(claim.fee, 2_700 * MILLI);
    assert_eq!(claim.reinvested, 12_150 * MILLI);
    assert_eq!(claim.paid_out, 12_150 * MILLI);

    assert_eq!(h.transfer.balance_of(&treasury()), tokens(70) + 1_890 * MILLI);
    assert_eq!(h.transfer.balance_of(&treasury2()), tokens(30) + 810 * MILLI);
    assert_eq!(h.ledger.global().pending_fees, 0);
    assert_eq!(h.ledger.total_deposit(), tokens(900) + 12_150 * MILLI);
}

// ------------------------------------------------------------------
// Referrals
// ------------------------------------------------------------------

#[test]
fn referrer_totals_follow_top_ups() {
    let mut h = Harness::without_fees();
    let (a, b) = (addr(0xa), addr(0xb));

    h.deposit(&b, tokens(10), Some(a)).unwrap();
    let ra = h.ledger.account(&a).unwrap();
    assert_eq!(ra.total_direct_investment, tokens(10));
    assert_eq!(ra.direct_refs_count, 1);

    h.skip_deposit_delay();
    h.deposit(&b, tokens(5), None).unwrap();
    let ra = h.ledger.account(&a).unwrap();
    assert_eq!(ra.total_direct_investment, tokens(15));
    assert_eq!(ra.direct_refs_count, 1);
}

#[test]
fn twelve_account_chain_downline_counts() {
    let mut h = Harness::without_fees();
    let chain: Vec<Address> = (1..=12).map(addr).collect();
    for (k, who) in chain.iter().enumerate() {
        let referrer = k.checked_sub(1).map(|i| chain[i]);
        h.deposit(who, tokens(100), referrer).unwrap();
    }

    let counts: Vec<u64> = chain
        .iter()
        .map(|a| h.ledger.account(a).unwrap().downline_refs_count)
        .collect();
    assert_eq!(counts, vec![9, 9, 8, 7, 6, 5, 4, 3, 2, 1, 0, 0]);

    let head = h.ledger.account(&chain[0]).unwrap();
    assert_eq!(head.direct_refs_count, 1);
    assert_eq!(head.total_direct_investment, tokens(100));
    assert_eq!(head.total_downline_investment, tokens(900));
    assert_eq!(h.ledger.account(&chain[11]).unwrap().direct_refs_count, 0);
}

#[test]
fn chain_top_up_credits_downline_totals_only() {
    let mut h = Harness::without_fees();
    let chain: Vec<Address> = (1..=12).map(addr).collect();
    for (k, who) in chain.iter().enumerate() {
        let referrer = k.checked_sub(1).map(|i| chain[i]);
        h.deposit(who, tokens(100), referrer).unwrap();
    }
    let before: Vec<_> = chain.iter().map(|a| h.ledger.account(a).unwrap().clone()).collect();

    h.skip_deposit_delay();
    h.deposit(&chain[11], tokens(50), None).unwrap();

    let direct = h.ledger.account(&chain[10]).unwrap();
    assert_eq!(direct.total_direct_investment, tokens(150));
    assert_eq!(direct.direct_refs_count, 1);
    for k in 1..=9 {
        let acct = h.ledger.account(&chain[k]).unwrap();
        assert_eq!(
            acct.total_downline_investment,
            before[k].total_downline_investment + tokens(50),
            "ancestor {k}"
        );
        assert_eq!(acct.downline_refs_count, before[k].downline_refs_count, "ancestor {k}");
        assert_eq!(acct.direct_refs_count, before[k].direct_refs_count, "ancestor {k}");
    }
    let head = h.ledger.account(&chain[0]).unwrap();
    assert_eq!(head.total_downline_investment, before[0].total_downline_investment);
    assert_eq!(head.total_downline_investment, tokens(900));
    assert_eq!(head.downline_refs_count, 9);
}

#[test]
fn referrer_naming_its_own_referee_is_ignored() {
    let mut h = Harness::without_fees();
    let (a, b) = (addr(0xa), addr(0xb));

    // `a` is named before it has ever deposited.
    h.deposit(&b, tokens(10), Some(a)).unwrap();
    let receipt = h.deposit(&a, tokens(100), Some(b)).unwrap();
    assert!(receipt.first_deposit);

    let ra = h.ledger.account(&a).unwrap();
    assert_eq!(ra.referrer, None);
    assert_eq!(ra.total_investment, tokens(100));
    assert_eq!(ra.total_direct_investment, tokens(10));
    assert_eq!(ra.direct_refs_count, 1);
    assert_eq!(ra.total_downline_investment, 0);
    assert_eq!(ra.downline_refs_count, 0);

    let rb = h.ledger.account(&b).unwrap();
    assert_eq!(rb.referrer, Some(a));
    assert_eq!(rb.total_direct_investment, 0);
    assert_eq!(rb.direct_refs_count, 0);
    assert_eq!(rb.total_downline_investment, 0);
    assert_eq!(rb.downline_refs_count, 0);

    // Later top-ups by the head credit nobody.
    h.skip_deposit_delay();
    h.deposit(&a, tokens(100), None).unwrap();
    assert_eq!(h.ledger.account(&b).unwrap().total_downline_investment, 0);
    assert_eq!(h.ledger.account(&a).unwrap().total_downline_investment, 0);
}

#[test]
fn referral_commission_accrues_to_referrer() {
    let mut h = Harness::without_fees();
    let (a, b) = (addr(1), addr(2));
    h.deposit(&b, tokens(100_000), Some(a)).unwrap();
    h.advance_rounds(2);

    // 0.025% of 100_000 per round; the referrer has no personal balance.
    assert_eq!(
        h.ledger.last_round_rewards(&a).unwrap(),
        RewardBreakdown { personal: 0, referral: tokens(25), pool: 0 }
    );
    assert_eq!(h.ledger.accumulated_rewards(&a).unwrap(), tokens(50));
}

#[test]
fn referrer_settles_before_totals_change() {
    let mut h = Harness::without_fees();
    let (a, b) = (addr(1), addr(2));
    h.deposit(&b, tokens(100_000), Some(a)).unwrap();

    // The cooldown is four rounds; the top-up lands after them at the old total.
    h.skip_deposit_delay();
    h.deposit(&b, tokens(100_000), None).unwrap();
    let ra = h.ledger.account(&a).unwrap();
    assert_eq!(ra.accumulated_reward, tokens(100));
    assert_eq!(ra.total_direct_investment, tokens(200_000));
}

// ------------------------------------------------------------------
// Pools
// ------------------------------------------------------------------

#[test]
fn qualifying_referrer_joins_pool_on_referee_deposit() {
    let mut h = Harness::without_fees();
    let (leader, member) = (addr(1), addr(2));

    h.deposit(&leader, tokens(550_000), None).unwrap();
    assert!(!h.ledger.is_member(&leader, 0));

    let receipt = h.deposit(&member, tokens(550_000), Some(leader)).unwrap();
    assert!(receipt.joined_pools.is_empty());
    assert!(h.ledger.is_member(&leader, 0));
    assert_eq!(h.ledger.pool(0).unwrap().member_count, 1);

    // 1_100_000 × 0.0175% per round, one member.
    h.advance_rounds(1);
    assert_eq!(h.ledger.last_round_rewards(&leader).unwrap().pool, 192_500 * MILLI);
}

#[test]
fn pool_reward_is_split_between_members() {
    let mut h = Harness::without_fees();
    let (big, w1, w2) = (addr(1), addr(2), addr(3));
    h.deposit(&big, tokens(1_000_000), None).unwrap();
    h.ledger.set_whitelist(&admin(), &w1, 7, true).unwrap();
    h.ledger.set_whitelist(&admin(), &w2, 7, true).unwrap();

    h.advance_rounds(2);
    // 1_000_000 × 0.01% = 100 per round, halved.
    assert_eq!(h.ledger.accumulated_rewards(&w1).unwrap(), tokens(100));
    assert_eq!(h.ledger.accumulated_rewards(&w2).unwrap(), tokens(100));
    assert_eq!(h.ledger.pool(7).unwrap().member_count, 2);
    assert_eq!(h.ledger.whitelisted_count(), 2);
}

#[test]
fn whitelisted_member_claims_pool_reward() {
    let mut h = Harness::without_fees();
    let (big, w) = (addr(1), addr(9));
    h.deposit(&big, tokens(1_000_000), None).unwrap();
    h.ledger.set_whitelist(&admin(), &w, 8, true).unwrap();
    h.advance_rounds(3);

    let receipt = h.ledger.claim(&w).unwrap();
    assert_eq!(receipt.claimed, tokens(300));
    assert_eq!(receipt.paid_out, tokens(150));
    assert_eq!(h.ledger.account(&w).unwrap().total_investment, tokens(150));
    assert_eq!(h.ledger.investor_count(), 1);
    assert_eq!(h.sum_of_balances(), h.ledger.total_deposit());
}

#[test]
fn revoking_whitelist_keeps_earned_reward() {
    let mut h = Harness::without_fees();
    let (big, w) = (addr(1), addr(9));
    h.deposit(&big, tokens(1_000_000), None).unwrap();
    h.ledger.set_whitelist(&admin(), &w, 7, true).unwrap();
    h.ledger.set_whitelist(&admin(), &w, 8, true).unwrap();
    h.advance_rounds(2);

    h.ledger.set_whitelist(&admin(), &w, 7, false).unwrap();
    // Both pools are credited on removal: 2 × 100 each.
    assert_eq!(h.ledger.account(&w).unwrap().accumulated_reward, tokens(400));
    assert_eq!(h.ledger.whitelisted_count(), 1);

    h.advance_rounds(1);
    assert_eq!(h.ledger.accumulated_rewards(&w).unwrap(), tokens(500));
}

// ------------------------------------------------------------------
// Criteria updates
// ------------------------------------------------------------------

fn new_pool0() -> PoolCriteria {
    PoolCriteria::in_tokens(275_000, 560_000, 1)
}

/// R qualifies only under the new criteria, D only under the old.
fn criteria_fixture() -> (Harness, [Address; 4]) {
    let mut h = Harness::without_fees();
    let (r, c, d, e) = (addr(0x11), addr(0x12), addr(0x13), addr(0x14));
    h.deposit(&r, tokens(300_000), None).unwrap();
    h.deposit(&c, tokens(600_000), Some(r)).unwrap();
    h.deposit(&d, tokens(600_000), None).unwrap();
    h.deposit(&e, tokens(555_000), Some(d)).unwrap();
    (h, [r, c, d, e])
}

#[test]
fn resumable_sweep_moves_members() {
    let (mut h, [r, c, d, e]) = criteria_fixture();
    assert!(h.ledger.is_member(&d, 0));
    assert!(!h.ledger.is_member(&r, 0));
    h.advance_rounds(2);

    let progress = h.ledger.set_pool_criteria(&admin(), &[0], &[new_pool0()], 2).unwrap();
    assert_eq!(progress, SweepProgress { visited: 2, cursor: 2, registry_len: 4, completed: false });
    assert!(h.ledger.is_member(&r, 0));
    assert!(h.ledger.is_member(&d, 0));

    assert_eq!(h.ledger.deposit(&c, tokens(1), None), Err(LedgerError::CriteriaUpdateInProgress));
    assert_eq!(h.ledger.claim(&e), Err(LedgerError::CriteriaUpdateInProgress));

    let progress = h.ledger.set_pool_criteria(&admin(), &[], &[], 2).unwrap();
    assert!(progress.completed);
    assert!(!h.ledger.is_member(&d, 0));
    assert_eq!(h.ledger.pool(0).unwrap().member_count, 1);
    assert_eq!(h.ledger.pool(0).unwrap().criteria, Some(new_pool0()));

    // Two rounds of personal 1_800, referral 138.75 and the whole pool 0
    // reward of 359.625 were credited before D left.
    assert_eq!(h.ledger.account(&d).unwrap().accumulated_reward, 4_596_750 * MILLI);

    for who in [r, c, d, e] {
        let acct = h.ledger.account(&who).unwrap();
        assert_eq!(acct.is_member(0), qualifies(acct, &new_pool0()), "{who}");
    }
}

#[test]
fn accounts_created_mid_sweep_are_visited() {
    let (mut h, _) = criteria_fixture();
    h.ledger.set_pool_criteria(&admin(), &[0], &[new_pool0()], 3).unwrap();

    // Whitelisting is allowed during a session and registers a new account.
    let late = addr(0x50);
    h.ledger.set_whitelist(&admin(), &late, 7, true).unwrap();

    let progress = h.ledger.set_pool_criteria(&admin(), &[], &[], 1).unwrap();
    assert_eq!(progress, SweepProgress { visited: 1, cursor: 4, registry_len: 5, completed: false });
    let progress = h.ledger.set_pool_criteria(&admin(), &[], &[], 1).unwrap();
    assert_eq!(progress, SweepProgress { visited: 1, cursor: 5, registry_len: 5, completed: true });
}

#[test]
fn criteria_cooldown_runs_from_completion() {
    let (mut h, _) = criteria_fixture();
    h.ledger.set_pool_criteria(&admin(), &[0], &[new_pool0()], 100).unwrap();
    let completed_at = h.ledger.now();
    let delay = h.ledger.config().criteria_update_delay;

    let again = [PoolCriteria::in_tokens(300_000, 600_000, 1)];
    assert_eq!(
        h.ledger.set_pool_criteria(&admin(), &[0], &again, 100),
        Err(LedgerError::CriteriaUpdateNotYetAvailable {
            now: completed_at,
            available_at: completed_at + delay,
        })
    );

    h.clock.set(completed_at + delay);
    assert!(h.ledger.set_pool_criteria(&admin(), &[0], &again, 100).unwrap().completed);
}

#[test]
fn invalid_proposals_are_rejected() {
    let (mut h, _) = criteria_fixture();
    let before = h.ledger.state().clone();

    // Below the pool it sits above.
    assert_eq!(
        h.ledger.set_pool_criteria(&admin(), &[1], &[PoolCriteria::in_tokens(500_000, 1_000_000, 3)], 1),
        Err(LedgerError::SequencePoolCriteriaBroken { pool_id: 1 })
    );
    // Direct requirement less than twice the personal one.
    assert_eq!(
        h.ledger.set_pool_criteria(&admin(), &[0], &[PoolCriteria::in_tokens(500_000, 900_000, 1)], 1),
        Err(LedgerError::HalfRequirementViolated { pool_id: 0 })
    );
    assert_eq!(
        h.ledger.set_pool_criteria(&admin(), &[7], &[new_pool0()], 1),
        Err(LedgerError::InvalidPoolId(7))
    );
    assert_eq!(
        h.ledger.set_pool_criteria(&admin(), &[0, 1], &[new_pool0()], 1),
        Err(LedgerError::InvalidArrayLengths { pools: 2, criteria: 1 })
    );
    assert_eq!(h.ledger.state(), &before);
}
