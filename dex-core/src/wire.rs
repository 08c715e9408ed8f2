//! Canonical wire layouts for every DEX entity and transaction, in one
//! place so the byte-level contract stays auditable.
//!
//! Layouts are frozen. Two historical oddities are deliberately preserved:
//! `OrderDetail` writes its `tx_cord` twice (mid-struct and trailing), and
//! the extended market-order transactions emit their operator block before
//! the fee fields while every other extended form emits it after.

use crate::tx::{
    CancelBody, DealItem, DexTx, DexTxKind, LimitOrderBody, MarketBuyBody, MarketSellBody,
    OperatorParams, SettleBody, SignaturePair, TxType, SETTLE_EX_VERSION,
};
use crate::types::{ActiveOrder, DexOperator, OperatorMode, OrderDetail, OrderGenerateType, OrderSide, OrderType};
use dex_primitives::codec::{CodecError, Decode, Encode, Reader};
use dex_primitives::{RegId, TokenSymbol, TxCord, TxId, DEX_RESERVED_ID};
use sp_std::vec::Vec;

impl Encode for OperatorMode {
    fn encode_to(&self, out: &mut Vec<u8>) {
        out.push(*self as u8);
    }
}

impl Decode for OperatorMode {
    fn decode(input: &mut Reader) -> Result<Self, CodecError> {
        OperatorMode::from_byte(input.read_byte()?).ok_or(CodecError::UnknownEnum)
    }
}

impl Encode for OrderSide {
    fn encode_to(&self, out: &mut Vec<u8>) {
        out.push(*self as u8);
    }
}

impl Decode for OrderSide {
    fn decode(input: &mut Reader) -> Result<Self, CodecError> {
        OrderSide::from_byte(input.read_byte()?).ok_or(CodecError::UnknownEnum)
    }
}

impl Encode for OrderType {
    fn encode_to(&self, out: &mut Vec<u8>) {
        out.push(*self as u8);
    }
}

impl Decode for OrderType {
    fn decode(input: &mut Reader) -> Result<Self, CodecError> {
        OrderType::from_byte(input.read_byte()?).ok_or(CodecError::UnknownEnum)
    }
}

impl Encode for OrderGenerateType {
    fn encode_to(&self, out: &mut Vec<u8>) {
        out.push(*self as u8);
    }
}

impl Decode for OrderGenerateType {
    fn decode(input: &mut Reader) -> Result<Self, CodecError> {
        OrderGenerateType::from_byte(input.read_byte()?).ok_or(CodecError::UnknownEnum)
    }
}

impl Encode for OrderDetail {
    fn encode_to(&self, out: &mut Vec<u8>) {
        self.mode.encode_to(out);
        self.dex_id.encode_to(out);
        self.operator_fee_ratio.encode_to(out);
        self.generate_type.encode_to(out);
        self.order_type.encode_to(out);
        self.order_side.encode_to(out);
        self.coin_symbol.encode_to(out);
        self.asset_symbol.encode_to(out);
        self.coin_amount.encode_to(out);
        self.asset_amount.encode_to(out);
        self.price.encode_to(out);
        self.tx_cord.encode_to(out);
        self.user_regid.encode_to(out);
        self.total_deal_coin_amount.encode_to(out);
        self.total_deal_asset_amount.encode_to(out);
        // Trailing duplicate coordinate, kept for compatibility with
        // already-persisted records.
        self.tx_cord.encode_to(out);
    }
}

impl Decode for OrderDetail {
    fn decode(input: &mut Reader) -> Result<Self, CodecError> {
        let mut detail = OrderDetail {
            mode: OperatorMode::decode(input)?,
            dex_id: u32::decode(input)?,
            operator_fee_ratio: u64::decode(input)?,
            generate_type: OrderGenerateType::decode(input)?,
            order_type: OrderType::decode(input)?,
            order_side: OrderSide::decode(input)?,
            coin_symbol: TokenSymbol::decode(input)?,
            asset_symbol: TokenSymbol::decode(input)?,
            coin_amount: u64::decode(input)?,
            asset_amount: u64::decode(input)?,
            price: u64::decode(input)?,
            tx_cord: TxCord::decode(input)?,
            user_regid: RegId::decode(input)?,
            total_deal_coin_amount: u64::decode(input)?,
            total_deal_asset_amount: u64::decode(input)?,
        };
        // The trailing copy wins, as it always has.
        detail.tx_cord = TxCord::decode(input)?;
        Ok(detail)
    }
}

impl Encode for ActiveOrder {
    fn encode_to(&self, out: &mut Vec<u8>) {
        self.generate_type.encode_to(out);
        self.tx_cord.encode_to(out);
        self.total_deal_coin_amount.encode_to(out);
        self.total_deal_asset_amount.encode_to(out);
    }
}

impl Decode for ActiveOrder {
    fn decode(input: &mut Reader) -> Result<Self, CodecError> {
        Ok(ActiveOrder {
            generate_type: OrderGenerateType::decode(input)?,
            tx_cord: TxCord::decode(input)?,
            total_deal_coin_amount: u64::decode(input)?,
            total_deal_asset_amount: u64::decode(input)?,
        })
    }
}

impl Encode for DexOperator {
    fn encode_to(&self, out: &mut Vec<u8>) {
        self.owner_regid.encode_to(out);
        self.match_regid.encode_to(out);
        self.name.encode_to(out);
        self.portal_url.encode_to(out);
        self.maker_fee_ratio.encode_to(out);
        self.taker_fee_ratio.encode_to(out);
        self.memo.encode_to(out);
    }
}

impl Decode for DexOperator {
    fn decode(input: &mut Reader) -> Result<Self, CodecError> {
        Ok(DexOperator {
            owner_regid: RegId::decode(input)?,
            match_regid: RegId::decode(input)?,
            name: Vec::<u8>::decode(input)?,
            portal_url: Vec::<u8>::decode(input)?,
            maker_fee_ratio: u64::decode(input)?,
            taker_fee_ratio: u64::decode(input)?,
            memo: Vec::<u8>::decode(input)?,
        })
    }
}

impl Encode for DealItem {
    fn encode_to(&self, out: &mut Vec<u8>) {
        self.buy_order_id.encode_to(out);
        self.sell_order_id.encode_to(out);
        self.deal_price.encode_to(out);
        self.deal_coin_amount.encode_to(out);
        self.deal_asset_amount.encode_to(out);
    }
}

impl Decode for DealItem {
    fn decode(input: &mut Reader) -> Result<Self, CodecError> {
        Ok(DealItem {
            buy_order_id: TxId::decode(input)?,
            sell_order_id: TxId::decode(input)?,
            deal_price: u64::decode(input)?,
            deal_coin_amount: u64::decode(input)?,
            deal_asset_amount: u64::decode(input)?,
        })
    }
}

impl Encode for SignaturePair {
    fn encode_to(&self, out: &mut Vec<u8>) {
        self.regid.encode_to(out);
        self.signature.encode_to(out);
    }
}

impl Decode for SignaturePair {
    fn decode(input: &mut Reader) -> Result<Self, CodecError> {
        Ok(SignaturePair {
            regid: RegId::decode(input)?,
            signature: Vec::<u8>::decode(input)?,
        })
    }
}

fn encode_fee_block(tx: &DexTx, out: &mut Vec<u8>) {
    tx.fee_symbol.encode_to(out);
    tx.fees.encode_to(out);
}

fn encode_operator_block(params: &OperatorParams, out: &mut Vec<u8>) {
    params.mode.encode_to(out);
    params.dex_id.encode_to(out);
    params.operator_fee_ratio.encode_to(out);
}

impl Encode for DexTx {
    fn encode_to(&self, out: &mut Vec<u8>) {
        self.version.encode_to(out);
        self.valid_height.encode_to(out);
        self.tx_uid.encode_to(out);
        match &self.kind {
            DexTxKind::BuyLimit(body) | DexTxKind::SellLimit(body) => {
                encode_fee_block(self, out);
                body.coin_symbol.encode_to(out);
                body.asset_symbol.encode_to(out);
                body.asset_amount.encode_to(out);
                body.price.encode_to(out);
            }
            DexTxKind::BuyMarket(body) => {
                encode_fee_block(self, out);
                body.coin_symbol.encode_to(out);
                body.asset_symbol.encode_to(out);
                body.coin_amount.encode_to(out);
            }
            DexTxKind::SellMarket(body) => {
                encode_fee_block(self, out);
                body.coin_symbol.encode_to(out);
                body.asset_symbol.encode_to(out);
                body.asset_amount.encode_to(out);
            }
            DexTxKind::BuyLimitEx(body, params) | DexTxKind::SellLimitEx(body, params) => {
                encode_fee_block(self, out);
                encode_operator_block(params, out);
                body.coin_symbol.encode_to(out);
                body.asset_symbol.encode_to(out);
                body.asset_amount.encode_to(out);
                body.price.encode_to(out);
                params.memo.encode_to(out);
                params.operator_signature.encode_to(out);
            }
            // The extended market forms put the operator block ahead of the
            // fee fields. Historical layout; do not normalize.
            DexTxKind::BuyMarketEx(body, params) => {
                encode_operator_block(params, out);
                encode_fee_block(self, out);
                body.coin_symbol.encode_to(out);
                body.asset_symbol.encode_to(out);
                body.coin_amount.encode_to(out);
                params.memo.encode_to(out);
                params.operator_signature.encode_to(out);
            }
            DexTxKind::SellMarketEx(body, params) => {
                encode_operator_block(params, out);
                encode_fee_block(self, out);
                body.coin_symbol.encode_to(out);
                body.asset_symbol.encode_to(out);
                body.asset_amount.encode_to(out);
                params.memo.encode_to(out);
                params.operator_signature.encode_to(out);
            }
            DexTxKind::Cancel(body) => {
                encode_fee_block(self, out);
                body.order_id.encode_to(out);
            }
            DexTxKind::Settle(body) => {
                encode_fee_block(self, out);
                body.deal_items.encode_to(out);
            }
            DexTxKind::SettleEx(body) => {
                encode_fee_block(self, out);
                body.dex_id.encode_to(out);
                body.deal_items.encode_to(out);
                body.memo.encode_to(out);
            }
        }
        self.signature.encode_to(out);
    }
}

struct FeeBlock {
    fee_symbol: TokenSymbol,
    fees: u64,
}

fn decode_fee_block(input: &mut Reader) -> Result<FeeBlock, CodecError> {
    Ok(FeeBlock {
        fee_symbol: TokenSymbol::decode(input)?,
        fees: u64::decode(input)?,
    })
}

fn decode_operator_block(input: &mut Reader) -> Result<(OperatorMode, u32, u64), CodecError> {
    Ok((
        OperatorMode::decode(input)?,
        u32::decode(input)?,
        u64::decode(input)?,
    ))
}

fn decode_limit_body(input: &mut Reader) -> Result<LimitOrderBody, CodecError> {
    Ok(LimitOrderBody {
        coin_symbol: TokenSymbol::decode(input)?,
        asset_symbol: TokenSymbol::decode(input)?,
        asset_amount: u64::decode(input)?,
        price: u64::decode(input)?,
    })
}

impl DexTx {
    /// Decode a transaction whose type tag arrived in the outer envelope.
    pub fn decode_with_type(tx_type: TxType, bytes: &[u8]) -> Result<Self, CodecError> {
        let input = &mut Reader::new(bytes);
        let version = u32::decode(input)?;
        let valid_height = u32::decode(input)?;
        let tx_uid = RegId::decode(input)?;

        let (fee_block, kind) = match tx_type {
            TxType::DexLimitBuyOrder => {
                let fee_block = decode_fee_block(input)?;
                (fee_block, DexTxKind::BuyLimit(decode_limit_body(input)?))
            }
            TxType::DexLimitSellOrder => {
                let fee_block = decode_fee_block(input)?;
                (fee_block, DexTxKind::SellLimit(decode_limit_body(input)?))
            }
            TxType::DexMarketBuyOrder => {
                let fee_block = decode_fee_block(input)?;
                let body = MarketBuyBody {
                    coin_symbol: TokenSymbol::decode(input)?,
                    asset_symbol: TokenSymbol::decode(input)?,
                    coin_amount: u64::decode(input)?,
                };
                (fee_block, DexTxKind::BuyMarket(body))
            }
            TxType::DexMarketSellOrder => {
                let fee_block = decode_fee_block(input)?;
                let body = MarketSellBody {
                    coin_symbol: TokenSymbol::decode(input)?,
                    asset_symbol: TokenSymbol::decode(input)?,
                    asset_amount: u64::decode(input)?,
                };
                (fee_block, DexTxKind::SellMarket(body))
            }
            TxType::DexLimitBuyOrderEx | TxType::DexLimitSellOrderEx => {
                let fee_block = decode_fee_block(input)?;
                let (mode, dex_id, operator_fee_ratio) = decode_operator_block(input)?;
                let body = decode_limit_body(input)?;
                let params = OperatorParams {
                    mode,
                    dex_id,
                    operator_fee_ratio,
                    memo: Vec::<u8>::decode(input)?,
                    operator_signature: Option::<SignaturePair>::decode(input)?,
                };
                let kind = if tx_type == TxType::DexLimitBuyOrderEx {
                    DexTxKind::BuyLimitEx(body, params)
                } else {
                    DexTxKind::SellLimitEx(body, params)
                };
                (fee_block, kind)
            }
            TxType::DexMarketBuyOrderEx => {
                let (mode, dex_id, operator_fee_ratio) = decode_operator_block(input)?;
                let fee_block = decode_fee_block(input)?;
                let body = MarketBuyBody {
                    coin_symbol: TokenSymbol::decode(input)?,
                    asset_symbol: TokenSymbol::decode(input)?,
                    coin_amount: u64::decode(input)?,
                };
                let params = OperatorParams {
                    mode,
                    dex_id,
                    operator_fee_ratio,
                    memo: Vec::<u8>::decode(input)?,
                    operator_signature: Option::<SignaturePair>::decode(input)?,
                };
                (fee_block, DexTxKind::BuyMarketEx(body, params))
            }
            TxType::DexMarketSellOrderEx => {
                let (mode, dex_id, operator_fee_ratio) = decode_operator_block(input)?;
                let fee_block = decode_fee_block(input)?;
                let body = MarketSellBody {
                    coin_symbol: TokenSymbol::decode(input)?,
                    asset_symbol: TokenSymbol::decode(input)?,
                    asset_amount: u64::decode(input)?,
                };
                let params = OperatorParams {
                    mode,
                    dex_id,
                    operator_fee_ratio,
                    memo: Vec::<u8>::decode(input)?,
                    operator_signature: Option::<SignaturePair>::decode(input)?,
                };
                (fee_block, DexTxKind::SellMarketEx(body, params))
            }
            TxType::DexCancelOrder => {
                let fee_block = decode_fee_block(input)?;
                let body = CancelBody {
                    order_id: TxId::decode(input)?,
                };
                (fee_block, DexTxKind::Cancel(body))
            }
            TxType::DexTradeSettle => {
                let fee_block = decode_fee_block(input)?;
                // The two settle forms share a type tag; the version field
                // picks the layout.
                if version >= SETTLE_EX_VERSION {
                    let body = SettleBody {
                        dex_id: u32::decode(input)?,
                        deal_items: Vec::<DealItem>::decode(input)?,
                        memo: Vec::<u8>::decode(input)?,
                    };
                    (fee_block, DexTxKind::SettleEx(body))
                } else {
                    let body = SettleBody {
                        dex_id: DEX_RESERVED_ID,
                        deal_items: Vec::<DealItem>::decode(input)?,
                        memo: Vec::new(),
                    };
                    (fee_block, DexTxKind::Settle(body))
                }
            }
        };

        let signature = Vec::<u8>::decode(input)?;
        Ok(DexTx {
            version,
            valid_height,
            tx_uid,
            fee_symbol: fee_block.fee_symbol,
            fees: fee_block.fees,
            kind,
            signature,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::{DealItem, OperatorParams};
    use crate::types::OrderDetail;
    use dex_primitives::codec::decode_all;
    use dex_primitives::PRICE_BOOST;
    use hex_literal::hex;

    fn wusd() -> TokenSymbol {
        TokenSymbol::new("WUSD").unwrap()
    }

    fn wicc() -> TokenSymbol {
        TokenSymbol::new("WICC").unwrap()
    }

    fn sample_order_detail() -> OrderDetail {
        OrderDetail {
            mode: OperatorMode::Default,
            dex_id: 1,
            operator_fee_ratio: 0,
            generate_type: OrderGenerateType::UserGen,
            order_type: OrderType::LimitPrice,
            order_side: OrderSide::Buy,
            coin_symbol: wusd(),
            asset_symbol: wicc(),
            coin_amount: 1000,
            asset_amount: 100,
            price: 128,
            tx_cord: TxCord::new(10, 1),
            user_regid: RegId::new(2, 3),
            total_deal_coin_amount: 0,
            total_deal_asset_amount: 0,
        }
    }

    #[test]
    fn order_detail_frozen_vector() {
        let expected = hex!(
            "00"            // mode
            "01"            // dex_id
            "00"            // operator_fee_ratio
            "01"            // generate_type
            "01"            // order_type
            "01"            // order_side
            "0457555344"    // "WUSD"
            "0457494343"    // "WICC"
            "8768"          // coin_amount = 1000
            "64"            // asset_amount = 100
            "8100"          // price = 128
            "0a01"          // tx_cord (10, 1)
            "000000020003"  // user_regid (2, 3)
            "00"            // total_deal_coin_amount
            "00"            // total_deal_asset_amount
            "0a01"          // trailing tx_cord
        );
        let detail = sample_order_detail();
        assert_eq!(detail.encode(), expected);
        assert_eq!(decode_all::<OrderDetail>(&expected), Ok(detail));
    }

    #[test]
    fn active_order_frozen_vector() {
        let order = ActiveOrder::new(OrderGenerateType::UserGen, TxCord::new(100, 2));
        assert_eq!(order.encode(), hex!("01 64 02 00 00"));
        assert_eq!(decode_all::<ActiveOrder>(&order.encode()), Ok(order));
    }

    #[test]
    fn dex_operator_frozen_vector() {
        let operator = DexOperator {
            owner_regid: RegId::new(1, 0),
            match_regid: RegId::new(1, 1),
            name: b"dexop".to_vec(),
            portal_url: Vec::new(),
            maker_fee_ratio: 1_000_000,
            taker_fee_ratio: 1_000_000,
            memo: Vec::new(),
        };
        let expected = hex!(
            "000000010000"
            "000000010001"
            "05 64 65 78 6f 70"
            "00"
            "bd8440"
            "bd8440"
            "00"
        );
        assert_eq!(operator.encode(), expected);
        assert_eq!(decode_all::<DexOperator>(&expected), Ok(operator));
    }

    #[test]
    fn deal_item_frozen_vector() {
        let item = DealItem {
            buy_order_id: TxId::repeat_byte(0x11),
            sell_order_id: TxId::repeat_byte(0x22),
            deal_price: 300,
            deal_coin_amount: 2,
            deal_asset_amount: 1,
        };
        let mut expected = [0x11u8; 32].to_vec();
        expected.extend_from_slice(&[0x22; 32]);
        expected.extend_from_slice(&hex!("822c 02 01"));
        assert_eq!(item.encode(), expected);
        assert_eq!(decode_all::<DealItem>(&expected), Ok(item));
    }

    #[test]
    fn buy_limit_tx_frozen_vector() {
        let mut tx = DexTx::buy_limit(
            RegId::new(2, 3),
            100,
            wicc(),
            10_000,
            LimitOrderBody {
                coin_symbol: wusd(),
                asset_symbol: wicc(),
                asset_amount: 100,
                price: 128,
            },
        );
        tx.signature = vec![0xaa; 3];
        let expected = hex!(
            "01"            // version
            "64"            // valid_height
            "000000020003"  // tx_uid
            "0457494343"    // fee symbol "WICC"
            "ce10"          // fees = 10000
            "0457555344"    // coin symbol
            "0457494343"    // asset symbol
            "64"            // asset_amount
            "8100"          // price
            "03aaaaaa"      // signature
        );
        assert_eq!(tx.encode(), expected);
        assert_eq!(
            DexTx::decode_with_type(TxType::DexLimitBuyOrder, &expected),
            Ok(tx)
        );
    }

    fn roundtrip(tx: &DexTx) {
        let bytes = tx.encode();
        let decoded = DexTx::decode_with_type(tx.tx_type(), &bytes).unwrap();
        assert_eq!(&decoded, tx);
    }

    #[test]
    fn every_variant_round_trips() {
        let uid = RegId::new(2, 3);
        let limit = LimitOrderBody {
            coin_symbol: wusd(),
            asset_symbol: wicc(),
            asset_amount: 10,
            price: 3 * PRICE_BOOST,
        };
        let market_buy = MarketBuyBody {
            coin_symbol: wusd(),
            asset_symbol: wicc(),
            coin_amount: 77,
        };
        let market_sell = MarketSellBody {
            coin_symbol: wusd(),
            asset_symbol: wicc(),
            asset_amount: 55,
        };
        let params = OperatorParams::new(
            OperatorMode::RequireAuth,
            4,
            2_000_000,
            b"hello".to_vec(),
            Some(RegId::new(7, 0)),
        );
        let items = vec![DealItem {
            buy_order_id: TxId::repeat_byte(5),
            sell_order_id: TxId::repeat_byte(6),
            deal_price: PRICE_BOOST,
            deal_coin_amount: 4,
            deal_asset_amount: 4,
        }];

        let mut txs = vec![
            DexTx::buy_limit(uid, 9, wicc(), 100, limit.clone()),
            DexTx::sell_limit(uid, 9, wicc(), 100, limit.clone()),
            DexTx::buy_market(uid, 9, wicc(), 100, market_buy.clone()),
            DexTx::sell_market(uid, 9, wicc(), 100, market_sell.clone()),
            DexTx::buy_limit_ex(uid, 9, wicc(), 100, limit.clone(), params.clone()),
            DexTx::sell_limit_ex(uid, 9, wicc(), 100, limit, params.clone()),
            DexTx::buy_market_ex(uid, 9, wicc(), 100, market_buy, params.clone()),
            DexTx::sell_market_ex(uid, 9, wicc(), 100, market_sell, params),
            DexTx::cancel(uid, 9, wicc(), 100, TxId::repeat_byte(9)),
            DexTx::settle(uid, 9, wicc(), 100, items.clone()),
            DexTx::settle_ex(uid, 9, wicc(), 100, 4, items, b"m".to_vec()),
        ];
        for tx in &mut txs {
            tx.signature = vec![0xcd; 65];
            roundtrip(tx);
        }
    }

    #[test]
    fn settle_layouts_are_discriminated_by_version() {
        let uid = RegId::new(2, 3);
        let basic = DexTx::settle(uid, 9, wicc(), 100, Vec::new());
        let decoded = DexTx::decode_with_type(TxType::DexTradeSettle, &basic.encode()).unwrap();
        assert!(matches!(decoded.kind, DexTxKind::Settle(_)));

        let extended = DexTx::settle_ex(uid, 9, wicc(), 100, 6, Vec::new(), Vec::new());
        let decoded = DexTx::decode_with_type(TxType::DexTradeSettle, &extended.encode()).unwrap();
        match decoded.kind {
            DexTxKind::SettleEx(body) => assert_eq!(body.dex_id, 6),
            other => panic!("wrong settle form: {:?}", other),
        }
    }

    #[test]
    fn unknown_enum_bytes_are_rejected() {
        let mut bytes = sample_order_detail().encode();
        bytes[0] = 0x05; // no such operator mode
        assert_eq!(
            decode_all::<OrderDetail>(&bytes),
            Err(CodecError::UnknownEnum)
        );
    }

    #[test]
    fn truncated_entities_are_rejected() {
        let bytes = sample_order_detail().encode();
        assert_eq!(
            decode_all::<OrderDetail>(&bytes[..bytes.len() - 1]),
            Err(CodecError::Truncated)
        );
    }
}
