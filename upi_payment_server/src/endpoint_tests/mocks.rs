use mockall::mock;
use upi_payment_engine::{
    db_types::{NewOrder, Order, OrderId, OrderPatch, OrderStatusType},
    helpers::SignedParams,
    traits::{GatewayError, GatewayLink, GatewayOrder, GatewayOrderStatus, OrderStore, OrderStoreError},
};

mock! {
    pub Gateway {}
    impl GatewayLink for Gateway {
        async fn create_order(&self, params: SignedParams) -> Result<GatewayOrder, GatewayError>;
        async fn query_order(&self, params: SignedParams) -> Result<GatewayOrderStatus, GatewayError>;
    }
}

mock! {
    pub Store {}
    impl OrderStore for Store {
        fn url(&self) -> &str;
        async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderStoreError>;
        async fn fetch_order(&self, order_id: &OrderId) -> Result<Order, OrderStoreError>;
        async fn transition(
            &self,
            order_id: &OrderId,
            expected: &[OrderStatusType],
            next: Option<OrderStatusType>,
            patch: OrderPatch,
        ) -> Result<Order, OrderStoreError>;
    }
}
