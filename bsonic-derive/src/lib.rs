use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, DeriveInput};

/// Derive macro for field-less enums.
///
/// Generates `bsonic_core::codecs::EnumType` (the symbol table) and
/// `bsonic_core::BsonCodable` (through `EnumCodec`). The integer width is
/// taken from `#[repr]`, defaulting to `i32`. The enum must be `Copy` and
/// `PartialEq`.
///
/// # Example
///
/// ```ignore
/// use bsonic_core::BsonEnum;
///
/// #[derive(Debug, Clone, Copy, PartialEq, BsonEnum)]
/// #[repr(u8)]
/// enum Color {
///     Red = 1,
///     #[bson(rename = "GREEN")]
///     Green = 2,
/// }
/// ```
///
/// # Attributes
///
/// - `#[bson(rename = "name")]` on a variant - symbol used in the string representation
/// - `#[bson(rename = "name")]` on the enum - name used in error messages
#[proc_macro_derive(BsonEnum, attributes(bson))]
pub fn derive_bson_enum(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match derive_bson_enum_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn derive_bson_enum_impl(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "BsonEnum cannot be derived for generic enums",
        ));
    }

    let data = match &input.data {
        syn::Data::Enum(data) => data,
        _ => return Err(syn::Error::new_spanned(input, "BsonEnum can only be derived for enums")),
    };

    let mut symbols = Vec::with_capacity(data.variants.len());
    for variant in &data.variants {
        if !matches!(variant.fields, syn::Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "BsonEnum variants cannot carry fields",
            ));
        }
        let ident = &variant.ident;
        let symbol = parse_attrs(&variant.attrs)?
            .rename
            .unwrap_or_else(|| ident.to_string());
        symbols.push(quote! { (#symbol, #name::#ident) });
    }

    let type_name = parse_attrs(&input.attrs)?
        .rename
        .unwrap_or_else(|| name.to_string());
    let width = repr_width(input)?;

    Ok(quote! {
        impl ::bsonic_core::codecs::EnumType for #name {
            const NAME: &'static str = #type_name;
            const WIDTH: ::bsonic_core::IntegerWidth = ::bsonic_core::IntegerWidth::#width;
            const SYMBOLS: &'static [(&'static str, Self)] = &[#(#symbols),*];

            fn to_raw(self) -> i128 {
                self as i128
            }
        }

        impl ::bsonic_core::BsonCodable for #name {
            type Codec = ::bsonic_core::codecs::EnumCodec<Self>;

            fn build_codec(
                _registry: &::bsonic_core::CodecRegistry,
                options: &::bsonic_core::CodecOptions,
            ) -> ::bsonic_core::Result<Self::Codec> {
                ::bsonic_core::codecs::EnumCodec::new(options.representation)
            }
        }
    })
}

/// Maps `#[repr(..)]` to an `IntegerWidth` variant name.
fn repr_width(input: &DeriveInput) -> syn::Result<proc_macro2::Ident> {
    let mut width = None;

    for attr in &input.attrs {
        if !attr.path().is_ident("repr") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            let found = ["i8", "u8", "i16", "u16", "i32", "u32", "i64", "u64"]
                .into_iter()
                .find(|ty| meta.path.is_ident(ty));
            match found {
                Some(ty) => width = Some(ty.to_uppercase()),
                None if meta.path.is_ident("C") => {}
                None => return Err(meta.error("unsupported repr for BsonEnum")),
            }
            Ok(())
        })?;
    }

    let width = width.unwrap_or_else(|| "I32".to_string());
    Ok(proc_macro2::Ident::new(&width, proc_macro2::Span::call_site()))
}

#[derive(Default)]
struct BsonAttrs {
    rename: Option<String>,
}

fn parse_attrs(attrs: &[syn::Attribute]) -> syn::Result<BsonAttrs> {
    let mut result = BsonAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("bson") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let value: syn::LitStr = meta.value()?.parse()?;
                result.rename = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("unknown bson attribute"))
            }
        })?;
    }

    Ok(result)
}
