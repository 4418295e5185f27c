/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */
#![forbid(unsafe_code)]

//! Procedural macros for gridlink.
//!
//! # Payload Macro
//!
//! [`grid_payload`] turns a plain struct or enum into a payload value object that
//! can travel inside an envelope:
//!
//! ```ignore
//! #[grid_payload]
//! pub struct MeasurementFilter {
//!     pub id: u32,
//!     pub node: String,
//!     pub all: bool,
//! }
//! ```
//!
//! # Main Entry Point
//!
//! [`gridlink_main`] builds the Tokio runtime for a gridlink binary:
//!
//! ```ignore
//! #[gridlink_main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = GridlinkApp::launch_async(config, collaborators).await?;
//!     runtime.shutdown().await
//! }
//! ```

use proc_macro::TokenStream;

use quote::quote;
use syn::{parse_macro_input, DeriveInput, ItemFn};

fn has_derive(input: &DeriveInput, trait_name: &str) -> bool {
    input.attrs.iter().any(|attr| {
        if attr.path().is_ident("derive") {
            let mut found = false;
            let _ = attr.parse_nested_meta(|meta| {
                if meta.path.is_ident(trait_name) {
                    found = true;
                }
                Ok(())
            });
            found
        } else {
            false
        }
    })
}

/// Options accepted by `#[grid_payload(...)]`.
#[derive(Default)]
struct PayloadConfig {
    /// Skip `PartialEq` for types holding fields that cannot be compared.
    no_eq: bool,
    /// Add `#[serde(rename_all = "camelCase")]` to match the wire field names.
    camel: bool,
}

impl PayloadConfig {
    fn parse(attr: &TokenStream) -> Self {
        let mut config = Self::default();
        let attr_string = attr.to_string();
        for part in attr_string.split(',') {
            match part.trim() {
                "no_eq" => config.no_eq = true,
                "camel" => config.camel = true,
                _ => {}
            }
        }
        config
    }
}

/// Derives the traits every payload value object needs.
///
/// Expands to `#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]`
/// (skipping any trait already derived) plus a compile-time assertion that the
/// type is `Send + Sync + 'static`, since payloads cross worker tasks.
///
/// Options:
/// - `no_eq`: do not derive `PartialEq`
/// - `camel`: rename fields to camelCase on the wire
#[proc_macro_attribute]
pub fn grid_payload(attr: TokenStream, item: TokenStream) -> TokenStream {
    let config = PayloadConfig::parse(&attr);
    let input = parse_macro_input!(item as DeriveInput);
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let mut traits = Vec::new();
    if !has_derive(&input, "Clone") {
        traits.push(quote!(Clone));
    }
    if !has_derive(&input, "Debug") {
        traits.push(quote!(Debug));
    }
    if !config.no_eq && !has_derive(&input, "PartialEq") {
        traits.push(quote!(PartialEq));
    }
    if !has_derive(&input, "Serialize") {
        traits.push(quote!(serde::Serialize));
    }
    if !has_derive(&input, "Deserialize") {
        traits.push(quote!(serde::Deserialize));
    }
    let derives = if traits.is_empty() {
        quote!()
    } else {
        quote!(#[derive(#(#traits),*)])
    };
    let rename = if config.camel {
        quote!(#[serde(rename_all = "camelCase")])
    } else {
        quote!()
    };

    let assert_ident = quote::format_ident!("_AssertGridPayload_{}", name);

    let expanded = quote! {
        #derives
        #rename
        #input

        const _: () = {
            #[allow(non_snake_case, dead_code)]
            fn #assert_ident #impl_generics () #where_clause {
                fn assert_bounds<T: Send + Sync + 'static>() {}
                assert_bounds::<#name #ty_generics>();
            }
        };
    };

    TokenStream::from(expanded)
}

/// Entry point macro for gridlink binaries.
///
/// Builds a Tokio runtime and blocks on the async `main` body. Supports
/// `flavor = "current_thread"` and `worker_threads = N`; the default is a
/// multi-threaded runtime.
#[proc_macro_attribute]
pub fn gridlink_main(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);

    let attrs = &input.attrs;
    let vis = &input.vis;
    let sig = &input.sig;
    let body = &input.block;

    if sig.asyncness.is_none() {
        return syn::Error::new_spanned(
            sig.fn_token,
            "the async keyword is missing from the function declaration",
        )
        .to_compile_error()
        .into();
    }

    if sig.ident != "main" {
        return syn::Error::new_spanned(
            &sig.ident,
            "gridlink_main can only be applied to the main function",
        )
        .to_compile_error()
        .into();
    }

    let attr_string = attr.to_string();
    let use_current_thread = attr_string.contains("current_thread");
    let worker_threads: Option<usize> = attr_string
        .split(',')
        .find(|s| s.contains("worker_threads"))
        .and_then(|s| s.split('=').nth(1).and_then(|v| v.trim().parse().ok()));

    let runtime_builder = if use_current_thread {
        quote! {
            ::gridlink::prelude::tokio::runtime::Builder::new_current_thread()
        }
    } else if let Some(threads) = worker_threads {
        quote! {
            ::gridlink::prelude::tokio::runtime::Builder::new_multi_thread()
                .worker_threads(#threads)
        }
    } else {
        quote! {
            ::gridlink::prelude::tokio::runtime::Builder::new_multi_thread()
        }
    };

    let fn_name = &sig.ident;
    let fn_inputs = &sig.inputs;
    let fn_output = &sig.output;

    let expanded = quote! {
        #(#attrs)*
        #vis fn #fn_name(#fn_inputs) #fn_output {
            #runtime_builder
                .enable_all()
                .build()
                .expect("Failed to build gridlink runtime")
                .block_on(async #body)
        }
    };

    TokenStream::from(expanded)
}
