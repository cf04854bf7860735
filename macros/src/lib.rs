use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, spanned::Spanned, ItemFn};

/// Marks a test that runs natively and under `wasm-bindgen-test`.
///
/// Synchronous functions become plain `#[test]`s. `async fn` tests run on a
/// current-thread tokio runtime, so futures holding `Rc` state can be awaited
/// without a `Send` bound.
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
  let input = parse_macro_input!(item as ItemFn);

  let raw_args = proc_macro2::TokenStream::from(attr);
  if !raw_args.is_empty() {
    return TokenStream::from(
      syn::Error::new(
        raw_args.span(),
        "rxcore_macro::test takes no arguments; write #[rxcore_macro::test] on a sync or async \
         function",
      )
      .to_compile_error(),
    );
  }

  let is_async = input.sig.asyncness.is_some();

  let wasm_attr = if is_async {
    quote!(wasm_bindgen_test::wasm_bindgen_test(async))
  } else {
    quote!(wasm_bindgen_test::wasm_bindgen_test)
  };

  let native_attr =
    if is_async { quote!(tokio::test(flavor = "current_thread")) } else { quote!(test) };

  let expanded = quote! {
      #[cfg_attr(target_arch = "wasm32", #wasm_attr)]
      #[cfg_attr(not(target_arch = "wasm32"), #native_attr)]
      #input
  };

  TokenStream::from(expanded)
}
