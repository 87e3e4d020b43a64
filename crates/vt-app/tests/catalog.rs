use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use vt_app::catalog::{CatalogError, CatalogSource, StorefrontClient, StorefrontConfig};

async fn storefront(reply: Value) -> String {
    let app = Router::new().route(
        "/api/2024-01/graphql.json",
        post(move |headers: HeaderMap, Json(body): Json<Value>| {
            let reply = reply.clone();
            async move {
                let token = headers.get("X-Shopify-Storefront-Access-Token").and_then(|v| v.to_str().ok());
                if token != Some("secret") {
                    return (StatusCode::UNAUTHORIZED, Json(json!({ "errors": "unauthorized" })));
                }
                if body["variables"]["first"] != json!(2) {
                    return (StatusCode::BAD_REQUEST, Json(json!({ "errors": "bad limit" })));
                }
                (StatusCode::OK, Json(reply))
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn config(base: &str, token: &str) -> StorefrontConfig {
    let mut conf = StorefrontConfig::new(base, token);
    conf.product_limit = 2;
    conf
}

#[tokio::test]
async fn fetches_products_in_order() {
    let base = storefront(json!({
        "data": { "products": { "edges": [
            { "node": { "id": "gid://shopify/Product/1", "title": "Linen Throw", "description": "Stonewashed",
                        "productType": "Textiles", "tags": ["linen"], "featuredImage": { "url": "https://cdn/throw.jpg" } } },
            { "node": { "id": "gid://shopify/Product/2", "title": "Oak Stool", "description": "",
                        "productType": "", "tags": [], "featuredImage": null } }
        ] } }
    }))
    .await;

    let products = StorefrontClient::new(config(&base, "secret")).unwrap().fetch_products().await.unwrap();

    assert_eq!(products.len(), 2);
    assert_eq!(products[0].title, "Linen Throw");
    assert_eq!(products[0].featured_image_url.as_deref(), Some("https://cdn/throw.jpg"));
    assert_eq!(products[1].id, "gid://shopify/Product/2");
    assert_eq!(products[1].description, None);
    assert_eq!(products[1].product_type, None);
}

#[tokio::test]
async fn rejected_token_is_an_http_error() {
    let base = storefront(json!({ "data": { "products": { "edges": [] } } })).await;

    let err = StorefrontClient::new(config(&base, "wrong")).unwrap().fetch_products().await.unwrap_err();
    assert!(matches!(err, CatalogError::Http { status: 401, .. }), "got {err:?}");
}

#[tokio::test]
async fn graphql_errors_are_surfaced() {
    let base = storefront(json!({ "errors": [{ "message": "Field 'prodcts' doesn't exist" }] })).await;

    let err = StorefrontClient::new(config(&base, "secret")).unwrap().fetch_products().await.unwrap_err();
    match err {
        CatalogError::GraphQl(message) => assert!(message.contains("prodcts")),
        other => panic!("expected GraphQL error, got {other:?}"),
    }
}
