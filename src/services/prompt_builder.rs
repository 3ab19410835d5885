// src/services/prompt_builder.rs
use crate::models::StylePreference;
use log::debug;

/// Returns the trimmed override when one is given, otherwise the try-on
/// instruction for `style`.
pub fn build_prompt(style: StylePreference, custom_override: &str) -> String {
    let custom = custom_override.trim();
    if !custom.is_empty() {
        debug!("Using custom prompt ({} chars)", custom.len());
        return custom.to_string();
    }

    debug!("Using default try-on prompt with style: {}", style);
    default_prompt(style.as_str())
}

fn default_prompt(style: &str) -> String {
    format!(
        r#"You are a professional fashion photographer. The photo shows a person HOLDING a fashion item in their hand.

TASK:
Generate a high-quality, realistic image of the SAME person with the SAME item now worn or carried on their body.

1. IDENTIFY THE ITEM:
   - Look closely at what they are holding
   - Note its exact color, material, cut and design

2. FREE THE HAND:
   - Their hand must end up empty and relaxed, holding nothing

3. PLACE THE ITEM BY CATEGORY:

   CLOTHING (shirt, top, dress, jacket, trousers):
   - Show it worn on the body with a natural fit and drape
   - Keep it identical to the garment that was held

   BAG / PURSE / BACKPACK:
   - On the shoulder, across the body, or hanging from the arm
   - Realistic strap placement, same design and color

   FOOTWEAR:
   - Worn on their feet, sized and angled realistically

   JEWELRY (necklace, bracelet, watch, ring):
   - On the matching body part (neck, wrist, finger)
   - Same design and finish

   EYEWEAR / SUNGLASSES:
   - Resting naturally on the face and nose

   HEADWEAR (hat, cap):
   - On the head at a natural angle and fit

4. PHOTO REALISM:
   - Keep the EXACT same person: face, body type, skin tone, hair
   - Keep the EXACT same background, lighting, shadows, pose and camera angle
   - The item must look like it was always there, with no seams or artifacts
   - Natural shadows and reflections on the item

5. STYLE:
   - Style preference: {style}
   - Present the item and outfit with a {style} aesthetic
   - Coordinate with what they are already wearing

6. QUALITY:
   - Sharp, high-resolution details and realistic textures
   - Professional fashion photography look

Generate one photorealistic virtual try-on image."#,
        style = style
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_prompt_mentions_style_and_is_deterministic() {
        for style in StylePreference::ALL {
            let first = build_prompt(style, "");
            let second = build_prompt(style, "");
            assert_eq!(first, second);
            assert!(first.contains(style.as_str()));
        }
    }

    #[test]
    fn default_prompt_covers_every_item_category() {
        let prompt = build_prompt(StylePreference::Formal, "   ");
        for category in ["CLOTHING", "BAG", "FOOTWEAR", "JEWELRY", "EYEWEAR", "HEADWEAR"] {
            assert!(prompt.contains(category), "missing {category}");
        }
    }

    #[test]
    fn custom_override_is_trimmed_and_wins() {
        assert_eq!(build_prompt(StylePreference::Casual, "  custom  "), "custom");
        assert_eq!(build_prompt(StylePreference::Trendy, "\n custom\t"), "custom");
    }
}
