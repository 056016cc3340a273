#[macro_export]
macro_rules! request {
    ( $method:ident $url:expr ; $($header:expr => $value:expr),* ; $($body:expr)? ) => {{
        let mut req = axum::http::Request::builder()
            .method(stringify!($method))
            .uri($url);

        $(
            req = req.header($header, $value);
        )*

        let body = axum::body::Body::empty();
        $(
            let body = axum::body::Body::from($body);
        )?

        req.body(body).expect("unable to build request")
    }};
}

#[macro_export]
macro_rules! send {
    ( $state:ident $req:expr ) => {{
        use tower::ServiceExt;
        server::server($state.clone())
            .oneshot($req)
            .await
            .expect("failed to send request")
    }};
}

#[macro_export]
macro_rules! fixture {
    ( $state:ident ; $( $req:expr ; )* ) => {{
        $(
            let resp = $crate::send!( $state $req );
            let status = resp.status();
            let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();

            assert!(status.is_success(), ":FIXTURE: status:{} :: {:?}", status, body);
        )*
    }};
}

#[macro_export]
macro_rules! status {
    ( 2xx ) => {{
        |resp: axum::http::Response<axum::body::Body>| {
            let status = resp.status();
            assert!(status.is_success(), "expected 2xx status, got {}", status);
            resp
        }
    }};

    ( $status:literal ) => {{
        |resp: axum::http::Response<axum::body::Body>| {
            assert_eq!(
                resp.status().as_u16(),
                $status,
                "expected status {}, got {}",
                $status,
                resp.status()
            );
            resp
        }
    }};
}

#[macro_export]
macro_rules! t {
    ( $e:expr ) => { $e };
    ( $e:expr => $f:expr ) => { $f($e) };
    ( $e:expr => $f:expr => $($g:tt)+ ) => { t! { $f($e) => $($g)+ } };
}
